//! Tempo-preserving pitch shifter.
//!
//! A pitch shift by ratio `r` is a WSOLA tempo change by `1/r` followed by a
//! resample at rate `r`: the first stage makes the signal `r` times longer
//! at the same pitch, the second plays it back `r` times faster. Frames go
//! in through [`PitchShifter::put_samples`] and come out, in any amount,
//! through [`PitchShifter::receive`].
//!
//! A base rate other than 1 is folded into the resampler, which is how a
//! file is played on a device running at a different sample rate.

mod stretch;
mod transposer;

pub use stretch::Stretch;
pub use transposer::{Transposer, AA_TAPS};

use super::fifo::FrameFifo;
use super::frame::StereoFrame;
use crate::config::StretchConfig;

const FIFO_CAPACITY: usize = 16384;

/// Semitones to frequency ratio.
pub fn semitone_ratio(semitones: f32) -> f64 {
    2f64.powf(semitones as f64 / 12.0)
}

pub struct PitchShifter {
    semitones: f32,
    range: f32,
    base_rate: f64,
    stretch: Stretch,
    transposer: Transposer,
    input: FrameFifo,
    mid: FrameFifo,
    output: FrameFifo,
}

impl PitchShifter {
    /// `range` bounds the accepted semitone value on both sides of 0.
    pub fn new(sample_rate: u32, range: f32, config: &StretchConfig) -> Self {
        Self {
            semitones: 0.0,
            range: range.abs(),
            base_rate: 1.0,
            stretch: Stretch::new(sample_rate, config),
            transposer: Transposer::new(FIFO_CAPACITY),
            input: FrameFifo::with_capacity(FIFO_CAPACITY),
            mid: FrameFifo::with_capacity(FIFO_CAPACITY),
            output: FrameFifo::with_capacity(FIFO_CAPACITY),
        }
    }

    /// Out-of-range values are clamped, NaN means no shift.
    pub fn set_pitch_semitones(&mut self, semitones: f32) {
        self.semitones = if semitones.is_nan() {
            0.0
        } else {
            semitones.clamp(-self.range, self.range)
        };
        self.apply_rates();
    }

    pub fn pitch_semitones(&self) -> f32 {
        self.semitones
    }

    pub fn pitch_ratio(&self) -> f64 {
        semitone_ratio(self.semitones)
    }

    pub fn set_base_rate(&mut self, rate: f64) {
        self.base_rate = if rate.is_finite() && rate > 0.0 { rate } else { 1.0 };
        self.apply_rates();
    }

    pub fn base_rate(&self) -> f64 {
        self.base_rate
    }

    fn apply_rates(&mut self) {
        let ratio = self.pitch_ratio();
        self.stretch.set_tempo(1.0 / ratio);
        self.transposer.set_rate(self.base_rate * ratio);
    }

    pub fn put_samples(&mut self, frames: &[StereoFrame]) {
        self.input.push_slice(frames);
        self.process();
    }

    /// Pushes enough silence to move every queued real frame to the output.
    pub fn flush(&mut self) {
        self.input.push_silence(self.stretch.sample_req() + AA_TAPS + 2);
        self.process();
    }

    pub fn available(&self) -> usize {
        self.output.len()
    }

    pub fn receive(&mut self, dest: &mut [StereoFrame]) -> usize {
        self.output.take_into(dest)
    }

    /// Back to the freshly constructed state; pitch and base rate are kept.
    pub fn clear(&mut self) {
        self.input.clear();
        self.mid.clear();
        self.output.clear();
        self.stretch.clear();
        self.transposer.clear();
    }

    fn process(&mut self) {
        self.stretch.process(&mut self.input, &mut self.mid);
        self.transposer.process(&mut self.mid, &mut self.output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    const RATE: u32 = 8000;

    fn shifter() -> PitchShifter {
        PitchShifter::new(RATE, 24.0, &StretchConfig::default())
    }

    fn sine(n: usize, freq: f32) -> Vec<StereoFrame> {
        (0..n)
            .map(|i| {
                let s = (std::f32::consts::TAU * freq * i as f32 / RATE as f32).sin() * 0.5;
                StereoFrame::new(s, s)
            })
            .collect()
    }

    fn drain(shifter: &mut PitchShifter) -> Vec<StereoFrame> {
        let mut out = vec![StereoFrame::zero(); shifter.available()];
        shifter.receive(&mut out);
        out
    }

    // zero crossings per frame, a cheap pitch estimate
    fn crossing_rate(frames: &[StereoFrame]) -> f64 {
        let crossings = frames
            .windows(2)
            .filter(|w| (w[0].left < 0.0) != (w[1].left < 0.0))
            .count();
        crossings as f64 / frames.len() as f64
    }

    #[test]
    fn semitone_ratio_matches_equal_temperament() {
        assert_eq!(semitone_ratio(0.0), 1.0);
        assert_relative_eq!(semitone_ratio(12.0), 2.0, epsilon = 1e-12);
        assert_relative_eq!(semitone_ratio(-12.0), 0.5, epsilon = 1e-12);
        assert_relative_eq!(semitone_ratio(7.0), 1.498_307_076_876_681_5, epsilon = 1e-12);
    }

    #[test]
    fn out_of_range_pitch_is_clamped() {
        let mut s = shifter();
        s.set_pitch_semitones(100.0);
        assert_eq!(s.pitch_semitones(), 24.0);
        s.set_pitch_semitones(-100.0);
        assert_eq!(s.pitch_semitones(), -24.0);
        s.set_pitch_semitones(f32::NAN);
        assert_eq!(s.pitch_semitones(), 0.0);
    }

    #[test]
    fn no_shift_reproduces_input() {
        let input = sine(6000, 330.0);
        let mut s = shifter();
        s.put_samples(&input);
        s.flush();
        let out = drain(&mut s);

        assert!(out.len() >= input.len());
        for (o, i) in out.iter().zip(&input) {
            assert_abs_diff_eq!(o.left, i.left, epsilon = 1e-6);
        }
    }

    #[test]
    fn octave_up_keeps_duration_and_doubles_frequency() {
        let input = sine(16000, 200.0);
        let mut s = shifter();
        s.set_pitch_semitones(12.0);
        s.put_samples(&input);
        let out = drain(&mut s);

        // most of the input has made it through, tempo unchanged
        assert!(out.len() > 12000 && out.len() <= 16000, "len {}", out.len());
        let ratio = crossing_rate(&out[1000..11000]) / crossing_rate(&input[1000..11000]);
        assert!((1.8..2.2).contains(&ratio), "ratio {ratio}");
    }

    #[test]
    fn octave_down_halves_frequency() {
        let input = sine(16000, 400.0);
        let mut s = shifter();
        s.set_pitch_semitones(-12.0);
        s.put_samples(&input);
        let out = drain(&mut s);

        assert!(out.len() > 12000, "len {}", out.len());
        let ratio = crossing_rate(&out[1000..11000]) / crossing_rate(&input[1000..11000]);
        assert!((0.4..0.6).contains(&ratio), "ratio {ratio}");
    }

    #[test]
    fn clear_matches_a_fresh_shifter() {
        let input = sine(9000, 250.0);

        let mut used = shifter();
        used.set_pitch_semitones(5.0);
        used.put_samples(&input[..3000]);
        used.clear();
        used.put_samples(&input);
        let after_clear = drain(&mut used);

        let mut fresh = shifter();
        fresh.set_pitch_semitones(5.0);
        fresh.put_samples(&input);
        let from_new = drain(&mut fresh);

        assert_eq!(after_clear, from_new);
    }

    #[test]
    fn pitch_can_change_between_puts() {
        let input = sine(20000, 300.0);
        let mut s = shifter();
        let mut total = 0;
        for (i, chunk) in input.chunks(1000).enumerate() {
            s.set_pitch_semitones(if i % 2 == 0 { 4.0 } else { -3.0 });
            s.put_samples(chunk);
            let out = drain(&mut s);
            assert!(out.iter().all(|f| f.left.is_finite() && f.left.abs() < 2.0));
            total += out.len();
        }
        assert!(total > 15000, "total {total}");
    }

    #[test]
    fn base_rate_changes_length() {
        let input = sine(16000, 300.0);
        let mut s = shifter();
        s.set_base_rate(2.0);
        s.put_samples(&input);
        s.flush();
        let out = drain(&mut s).len();
        assert!((7800..=8400).contains(&out), "len {out}");
    }
}
