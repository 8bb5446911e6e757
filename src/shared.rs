// Types shared between the TUI and the middle layer.
//
// The TUI turns keys into `InputEvent`s and draws whatever `DisplayState` the
// middle layer hands it every frame; it never looks at audio state itself.
//
// Keys:
//   Space         //  Play
//   p             //  PauseToggle
//   s             //  Stop
//   l             //  Reload (decode the last file again)
//   [ / ]         //  NudgePitch(-0.5 / +0.5)
//   0             //  ResetPitch
//   - / =         //  NudgeMaster(-0.05 / +0.05)
//   ; / '         //  NudgeTrim(-1.0 / +1.0)
//   1 2 3 4       //  SelectVis(Line / Circle / Lightning / Bars)
//   Esc / q       //  Quit

use crate::analysis::Snapshot;
use crate::middle::PlaybackState;

// slider bounds, the middle layer keeps controls inside these
pub const PITCH_SLIDER: f32 = 12.0; // semitones either way
pub const MASTER_MAX: f32 = 1.0;
pub const TRIM_SLIDER_DB: f32 = 20.0;

pub const PITCH_STEP: f32 = 0.5;
pub const MASTER_STEP: f32 = 0.05;
pub const TRIM_STEP_DB: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    Play,
    PauseToggle,
    Stop,
    Reload,
    NudgePitch(f32),
    ResetPitch,
    NudgeMaster(f32),
    NudgeTrim(f32),
    SelectVis(VisMode),
    Quit,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VisMode {
    #[default]
    Line,
    Circle,
    Lightning,
    Bars,
}

impl VisMode {
    pub fn from_digit(d: char) -> Option<Self> {
        match d {
            '1' => Some(VisMode::Line),
            '2' => Some(VisMode::Circle),
            '3' => Some(VisMode::Lightning),
            '4' => Some(VisMode::Bars),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VisMode::Line => "LINE",
            VisMode::Circle => "CIRCLE",
            VisMode::Lightning => "LIGHTNING",
            VisMode::Bars => "BARS",
        }
    }

    // which snapshot the mode draws from
    pub fn uses_frequency(self) -> bool {
        matches!(self, VisMode::Lightning | VisMode::Bars)
    }
}

#[derive(Clone, Debug)]
pub struct DisplayState {
    pub state: PlaybackState,
    pub file_name: Option<String>,
    pub status: String,
    pub pitch: f32,
    pub master: f32,
    pub trim_db: f32,
    pub vis_mode: VisMode,
    pub snapshot: Option<Snapshot>, // None = blank canvas
    pub frame: u64,                 // animation counter, advances once per refresh tick
}
