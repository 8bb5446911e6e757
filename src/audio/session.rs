use std::sync::Arc;

use super::filter::PitchPipe;
use super::frame::StereoFrame;
use super::gain::{Effect, GainChain, GainStage};
use super::sample_buffer::AudioBuffer;
use super::session_id::SessionId;
use super::shifter::PitchShifter;
use super::source::BufferSource;
use crate::config::Config;

/// Control values a session starts from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionParams {
    pub semitones: f32,
    pub master: f32,
    pub trim_db: f32,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            semitones: 0.0,
            master: 1.0,
            trim_db: 0.0,
        }
    }
}

/// The audio graph of one playback session: source, pitch pipe, gain chain.
/// Built on the control side, then moved whole into the engine.
pub struct SessionGraph {
    id: SessionId,
    pipe: PitchPipe<BufferSource>,
    gains: GainChain,
    end_reported: bool,
}

impl SessionGraph {
    /// `output_rate` is the rate frames are rendered at; a buffer at another
    /// rate is resampled by the shifter.
    pub fn new(
        buffer: Arc<AudioBuffer>,
        output_rate: u32,
        params: SessionParams,
        config: &Config,
    ) -> Self {
        let mut shifter = PitchShifter::new(buffer.sample_rate, config.pitch_range, &config.stretch);
        shifter.set_base_rate(buffer.sample_rate as f64 / output_rate.max(1) as f64);
        shifter.set_pitch_semitones(params.semitones);

        Self {
            id: SessionId::next(),
            pipe: PitchPipe::new(BufferSource::new(buffer), shifter, config.pull_frames),
            gains: GainChain::new(params.master, params.trim_db),
            end_reported: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Renders one block. Returns true exactly once, on the block where the
    /// stream runs out.
    pub fn render(&mut self, out: &mut [StereoFrame]) -> bool {
        let delivery = self.pipe.read_output(out);
        self.gains.process(out);
        if delivery.finished && !self.end_reported {
            self.end_reported = true;
            return true;
        }
        false
    }

    pub fn set_pitch(&mut self, semitones: f32) {
        self.pipe.shifter_mut().set_pitch_semitones(semitones);
    }

    pub fn pitch(&self) -> f32 {
        self.pipe.shifter().pitch_semitones()
    }

    pub fn set_gain(&mut self, stage: GainStage, value: f32) {
        self.gains.set(stage, value);
    }

    pub fn gain(&self, stage: GainStage) -> f32 {
        self.gains.linear(stage)
    }

    pub fn cursor(&self) -> usize {
        self.pipe.position()
    }

    /// Clears the shifter and rewinds the source.
    pub fn teardown(&mut self) {
        self.pipe.reset();
        self.end_reported = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn graph(n: usize, file_rate: u32, output_rate: u32, params: SessionParams) -> SessionGraph {
        let data = vec![StereoFrame::new(0.5, 0.5); n];
        let buffer = Arc::new(AudioBuffer::new(file_rate, 2, data));
        SessionGraph::new(buffer, output_rate, params, &Config::default())
    }

    #[test]
    fn ids_are_unique() {
        let a = graph(10, 44100, 44100, SessionParams::default());
        let b = graph(10, 44100, 44100, SessionParams::default());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn applies_gain_after_the_pipe() {
        let params = SessionParams { semitones: 0.0, master: 0.5, trim_db: -20.0 };
        let mut g = graph(4000, 8000, 8000, params);
        let mut out = vec![StereoFrame::zero(); 256];
        g.render(&mut out);
        assert_relative_eq!(out[100].left, 0.025, epsilon = 1e-5);
    }

    #[test]
    fn reports_end_once() {
        let mut g = graph(1000, 8000, 8000, SessionParams::default());
        let mut out = vec![StereoFrame::zero(); 600];
        assert!(!g.render(&mut out));
        assert!(g.render(&mut out));
        assert!(!g.render(&mut out));
    }

    #[test]
    fn rate_mismatch_changes_rendered_length() {
        // a 4000-frame file at 8 kHz lasts 8000 frames at 16 kHz
        let mut g = graph(4000, 8000, 16000, SessionParams::default());
        let mut out = vec![StereoFrame::zero(); 100];
        let mut blocks = 1;
        while !g.render(&mut out) {
            blocks += 1;
        }
        assert_eq!(blocks, 80);
    }

    #[test]
    fn teardown_rewinds() {
        let mut g = graph(5000, 8000, 8000, SessionParams::default());
        let mut out = vec![StereoFrame::zero(); 512];
        g.render(&mut out);
        assert!(g.cursor() > 0);
        g.teardown();
        assert_eq!(g.cursor(), 0);
    }

    #[test]
    fn parameters_reach_the_live_graph() {
        let mut g = graph(100, 44100, 44100, SessionParams::default());
        g.set_pitch(30.0);
        assert_eq!(g.pitch(), 24.0);
        g.set_gain(GainStage::Trim, 20.0);
        assert_relative_eq!(g.gain(GainStage::Trim), 10.0, epsilon = 1e-5);
    }
}
