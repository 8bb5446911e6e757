// The middle layer: owns everything the UI and the engine disagree about.
//
// It keeps the playback state machine, the slider positions and the decoded
// file, builds session graphs and hands them to the engine, and turns engine
// events plus analysis snapshots into the DisplayState the TUI draws.
//
//   Idle --load--> Ready --play--> Playing --pause--> Paused --play--> Playing
//                    ^                |                  |
//                    +------stop------+--------stop------+
//
// Operations that make no sense in the current state (play with nothing
// loaded, pause while stopped...) are silent no-ops.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::analysis::{Analyser, Snapshot};
use crate::audio::{AudioBuffer, GainStage, SessionGraph, SessionId, SessionParams};
use crate::audio_api::{AudioCommand, AudioOutput, EngineEvent};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::shared::{
    DisplayState, InputEvent, MASTER_MAX, PITCH_SLIDER, TRIM_SLIDER_DB, VisMode,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,    // nothing loaded
    Ready,   // session built, output not pulling from it
    Playing,
    Paused,  // output suspended, session kept where it was
}

impl PlaybackState {
    pub fn label(self) -> &'static str {
        match self {
            PlaybackState::Idle => "IDLE",
            PlaybackState::Ready => "READY",
            PlaybackState::Playing => "PLAYING",
            PlaybackState::Paused => "PAUSED",
        }
    }
}

/// Slider positions. Every new session starts from these.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Controls {
    pub pitch: f32,
    pub master: f32,
    pub trim_db: f32,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            pitch: 0.0,
            master: 1.0,
            trim_db: 0.0,
        }
    }
}

impl Controls {
    fn params(&self) -> SessionParams {
        SessionParams {
            semitones: self.pitch,
            master: self.master,
            trim_db: self.trim_db,
        }
    }
}

// Where the current session's graph lives.
enum Session {
    None,
    Staged(Box<SessionGraph>), // built on load, not yet sent
    Attached(SessionId),       // owned by the engine
}

/// Redraw schedule for the visualizer. Cancelling it leaves nothing pending.
#[derive(Clone, Debug)]
pub struct RefreshLoop {
    interval: Duration,
    running: bool,
    next_due: Option<Instant>, // None while running = fire on the next tick
}

impl RefreshLoop {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            running: false,
            next_due: None,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
        self.next_due = None;
    }

    pub fn cancel(&mut self) {
        self.running = false;
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_pending(&self) -> bool {
        self.next_due.is_some()
    }

    // true at most once per interval, and schedules the next one
    pub fn due(&mut self, now: Instant) -> bool {
        if !self.running {
            return false;
        }
        match self.next_due {
            Some(at) if now < at => false,
            _ => {
                self.next_due = Some(now + self.interval);
                true
            }
        }
    }
}

pub struct Middle<O: AudioOutput> {
    output: Option<O>, // None = no device, nothing can be loaded
    config: Config,
    state: PlaybackState,
    controls: Controls,
    buffer: Option<Arc<AudioBuffer>>,
    path: Option<PathBuf>,
    file_name: Option<String>,
    session: Session,
    analyser: Analyser,
    refresh: RefreshLoop,
    snapshot: Option<Snapshot>,
    frame: u64,
    vis_mode: VisMode,
    status: String,
    params_dirty: bool,   // controls moved but the live session hasn't heard yet
    detach_pending: bool, // stop() couldn't get Detach into the queue
}

impl<O: AudioOutput> Middle<O> {
    pub fn new(output: Option<O>, tap: Option<rtrb::Consumer<f32>>, config: Config) -> Self {
        let status = if output.is_some() {
            "Open a WAV file to start".to_string()
        } else {
            "No audio output available".to_string()
        };
        Self {
            output,
            analyser: Analyser::new(&config.analysis, tap),
            refresh: RefreshLoop::new(Duration::from_millis(config.tick_ms)),
            config,
            state: PlaybackState::Idle,
            controls: Controls::default(),
            buffer: None,
            path: None,
            file_name: None,
            session: Session::None,
            snapshot: None,
            frame: 0,
            vis_mode: VisMode::default(),
            status,
            params_dirty: false,
            detach_pending: false,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn refresh_loop(&self) -> &RefreshLoop {
        &self.refresh
    }

    pub fn current_session(&self) -> Option<SessionId> {
        match &self.session {
            Session::None => None,
            Session::Staged(graph) => Some(graph.id()),
            Session::Attached(id) => Some(*id),
        }
    }

    pub fn report(&mut self, err: &Error) {
        log::warn!("{err}");
        self.status = err.to_string();
    }

    // ── Lifecycle ─────────────────────────────────────────────────

    /// Decodes `path` and stages a session for it. Whatever was loaded before
    /// is torn down first; on failure the controller is left `Idle`.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        if self.output.is_none() {
            let err = Error::EngineUnavailable("no output device".to_string());
            self.report(&err);
            return Err(err);
        }
        self.unload();

        let buffer = match AudioBuffer::load_wav(path) {
            Ok(b) => b,
            Err(e) => {
                let err = Error::from(e);
                self.report(&err);
                return Err(err);
            }
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.load_buffer(buffer, name)?;
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    /// Stages a session for an already decoded buffer.
    pub fn load_buffer(&mut self, buffer: AudioBuffer, name: String) -> Result<()> {
        let Some(output_rate) = self.output.as_ref().map(|o| o.sample_rate()) else {
            let err = Error::EngineUnavailable("no output device".to_string());
            self.report(&err);
            return Err(err);
        };
        self.unload();

        log::info!(
            "loaded {name}: {:.1}s at {} Hz, {} channel(s)",
            buffer.duration_secs(),
            buffer.sample_rate,
            buffer.channels
        );
        let buffer = Arc::new(buffer);
        let graph = SessionGraph::new(buffer.clone(), output_rate, self.controls.params(), &self.config);
        self.buffer = Some(buffer);
        self.file_name = Some(name);
        self.session = Session::Staged(Box::new(graph));
        self.state = PlaybackState::Ready;
        self.status = "File loaded ✔".to_string();
        Ok(())
    }

    /// Decodes the last loaded file again.
    pub fn reload(&mut self) -> Result<()> {
        match self.path.clone() {
            Some(path) => self.load(&path),
            None => {
                log::debug!("reload with no file loaded");
                Ok(())
            }
        }
    }

    // back to Idle, releasing the session and the buffer
    fn unload(&mut self) {
        self.stop();
        self.session = Session::None;
        self.buffer = None;
        self.file_name = None;
        self.state = PlaybackState::Idle;
    }

    pub fn play(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Idle => {
                log::debug!("play with nothing loaded");
                Ok(())
            }
            PlaybackState::Playing => Ok(()),
            PlaybackState::Paused => {
                // slider moves made while suspended go out before the first block
                self.flush_params();
                self.resume_output()?;
                self.state = PlaybackState::Playing;
                self.refresh.start();
                self.status = "Resumed ▶".to_string();
                Ok(())
            }
            PlaybackState::Ready => {
                let graph = match std::mem::replace(&mut self.session, Session::None) {
                    Session::Staged(graph) => graph,
                    _ => match self.build_session() {
                        Some(graph) => graph,
                        None => return Ok(()),
                    },
                };
                let id = graph.id();
                if let Err(cmd) = self.send(AudioCommand::Attach(graph)) {
                    if let AudioCommand::Attach(graph) = cmd {
                        self.session = Session::Staged(graph);
                    }
                    let err = Error::CommandQueueFull;
                    self.report(&err);
                    return Err(err);
                }
                log::debug!("{id} attached");
                self.session = Session::Attached(id);
                // Attach replaces whatever a deferred Detach was meant for
                self.detach_pending = false;
                self.params_dirty = false;

                if let Err(e) = self.resume_output() {
                    // leave nothing connected behind a dead output
                    self.detach_pending = self.send(AudioCommand::Detach).is_err();
                    self.session = Session::None;
                    return Err(e);
                }
                self.state = PlaybackState::Playing;
                self.refresh.start();
                self.status = "Playing ▶".to_string();
                Ok(())
            }
        }
    }

    pub fn pause(&mut self) -> Result<()> {
        if self.state != PlaybackState::Playing {
            log::debug!("pause while {}", self.state.label());
            return Ok(());
        }
        if let Some(output) = self.output.as_mut() {
            if let Err(e) = output.suspend() {
                self.report(&e);
                return Err(e);
            }
        }
        self.refresh.cancel();
        self.state = PlaybackState::Paused;
        self.status = "Paused ⏸".to_string();
        Ok(())
    }

    pub fn toggle_pause(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused => self.play(),
            _ => Ok(()),
        }
    }

    /// Detaches the session and rewinds to `Ready`. Safe to call from any
    /// state, any number of times.
    pub fn stop(&mut self) {
        let was_paused = match self.state {
            PlaybackState::Playing => false,
            PlaybackState::Paused => true,
            PlaybackState::Idle | PlaybackState::Ready => return,
        };

        self.refresh.cancel();
        if self.send(AudioCommand::Detach).is_err() {
            log::warn!("detach deferred until the engine catches up");
            self.detach_pending = true;
        }
        if was_paused {
            // a suspended stream never drains its commands, so the graph
            // would stay attached until the next play
            if let Some(Err(e)) = self.output.as_mut().map(|o| o.resume()) {
                log::warn!("resume after stop failed: {e}");
            }
        }
        self.params_dirty = false;
        self.session = Session::None;
        self.snapshot = None;
        self.analyser.reset();
        self.state = PlaybackState::Ready;
        self.status = "Stopped ⏹ (back to start)".to_string();
    }

    fn resume_output(&mut self) -> Result<()> {
        if let Some(output) = self.output.as_mut() {
            if let Err(e) = output.resume() {
                self.report(&e);
                return Err(e);
            }
        }
        Ok(())
    }

    fn build_session(&self) -> Option<Box<SessionGraph>> {
        let buffer = self.buffer.clone()?;
        let rate = self.output.as_ref()?.sample_rate();
        Some(Box::new(SessionGraph::new(buffer, rate, self.controls.params(), &self.config)))
    }

    fn send(&mut self, cmd: AudioCommand) -> std::result::Result<(), AudioCommand> {
        match self.output.as_mut() {
            Some(output) => output.send(cmd),
            None => Err(cmd),
        }
    }

    // Sends a parameter change to the attached session. While paused nothing
    // drains the queue, so the change waits for `flush_params`.
    fn push_param(&mut self, cmd: AudioCommand) {
        if self.state == PlaybackState::Playing && !self.params_dirty {
            self.params_dirty = self.send(cmd).is_err();
        } else {
            self.params_dirty = true;
        }
    }

    // Sends the current controls in one go if anything is owed.
    fn flush_params(&mut self) {
        if !self.params_dirty || !matches!(self.session, Session::Attached(_)) {
            return;
        }
        let c = self.controls;
        let sent = self.send(AudioCommand::SetPitch(c.pitch)).is_ok()
            && self.send(AudioCommand::SetGain(GainStage::Master, c.master)).is_ok()
            && self.send(AudioCommand::SetGain(GainStage::Trim, c.trim_db)).is_ok();
        self.params_dirty = !sent;
    }

    // ── Parameters ────────────────────────────────────────────────

    pub fn set_pitch(&mut self, semitones: f32) {
        let semitones = if semitones.is_finite() { semitones } else { 0.0 };
        let pitch = semitones.clamp(-PITCH_SLIDER, PITCH_SLIDER);
        if pitch == self.controls.pitch {
            return;
        }
        self.controls.pitch = pitch;
        if let Session::Staged(graph) = &mut self.session {
            graph.set_pitch(pitch);
        } else if matches!(self.session, Session::Attached(_)) {
            self.push_param(AudioCommand::SetPitch(pitch));
        }
    }

    pub fn set_gain(&mut self, stage: GainStage, value: f32) {
        let value = if value.is_finite() { value } else { 0.0 };
        let (slot, value) = match stage {
            GainStage::Master => (&mut self.controls.master, value.clamp(0.0, MASTER_MAX)),
            GainStage::Trim => (
                &mut self.controls.trim_db,
                value.clamp(-TRIM_SLIDER_DB, TRIM_SLIDER_DB),
            ),
        };
        if *slot == value {
            return;
        }
        *slot = value;
        if let Session::Staged(graph) = &mut self.session {
            graph.set_gain(stage, value);
        } else if matches!(self.session, Session::Attached(_)) {
            self.push_param(AudioCommand::SetGain(stage, value));
        }
    }

    pub fn set_vis_mode(&mut self, mode: VisMode) {
        self.vis_mode = mode;
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        let result = match event {
            InputEvent::Play => self.play(),
            InputEvent::PauseToggle => self.toggle_pause(),
            InputEvent::Stop => {
                self.stop();
                Ok(())
            }
            InputEvent::Reload => self.reload(),
            InputEvent::NudgePitch(d) => {
                self.set_pitch(self.controls.pitch + d);
                Ok(())
            }
            InputEvent::ResetPitch => {
                self.set_pitch(0.0);
                Ok(())
            }
            InputEvent::NudgeMaster(d) => {
                self.set_gain(GainStage::Master, self.controls.master + d);
                Ok(())
            }
            InputEvent::NudgeTrim(d) => {
                self.set_gain(GainStage::Trim, self.controls.trim_db + d);
                Ok(())
            }
            InputEvent::SelectVis(mode) => {
                self.set_vis_mode(mode);
                Ok(())
            }
            InputEvent::Quit => Ok(()), // main loop handles it
        };
        // already reported where it happened
        if let Err(e) = result {
            log::debug!("{event:?} failed: {e}");
        }
    }

    // ── Per-frame work ────────────────────────────────────────────

    /// Retries whatever didn't fit in the command queue, drains engine events
    /// and the analysis tap, and takes a new snapshot when the refresh loop
    /// is due.
    pub fn tick(&mut self, now: Instant) {
        if self.detach_pending && self.send(AudioCommand::Detach).is_ok() {
            self.detach_pending = false;
        }
        if self.state == PlaybackState::Playing {
            self.flush_params();
        }

        while let Some(event) = self.output.as_mut().and_then(|o| o.poll_event()) {
            match event {
                EngineEvent::Retired(graph) => drop(graph), // freed here, not on the audio thread
                EngineEvent::Finished(id) => {
                    if matches!(self.session, Session::Attached(current) if current == id) {
                        self.stop();
                        self.status = "Finished ⏹".to_string();
                    }
                }
            }
        }

        self.analyser.drain();
        if self.refresh.due(now) {
            self.snapshot = Some(self.analyser.snapshot());
            self.frame = self.frame.wrapping_add(1);
        }
    }

    pub fn display_state(&self) -> DisplayState {
        DisplayState {
            state: self.state,
            file_name: self.file_name.clone(),
            status: self.status.clone(),
            pitch: self.controls.pitch,
            master: self.controls.master,
            trim_db: self.controls.trim_db,
            vis_mode: self.vis_mode,
            snapshot: self.snapshot.clone(),
            frame: self.frame,
        }
    }
}
