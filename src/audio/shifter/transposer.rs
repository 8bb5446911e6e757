// Rate change by linear interpolation, behind an anti-alias FIR.
use std::f64::consts::{PI, TAU};

use crate::audio::fifo::FrameFifo;
use crate::audio::frame::StereoFrame;

pub const AA_TAPS: usize = 33;
const CENTER: usize = AA_TAPS / 2;

pub struct Transposer {
    rate: f64,
    pos: f64, // read position into `filtered`, relative to its front
    taps: [f32; AA_TAPS],
    unfiltered: FrameFifo,
    filtered: FrameFifo,
}

impl Transposer {
    pub fn new(capacity: usize) -> Self {
        let mut transposer = Self {
            rate: 1.0,
            pos: 0.0,
            taps: [0.0; AA_TAPS],
            unfiltered: FrameFifo::with_capacity(capacity + AA_TAPS),
            filtered: FrameFifo::with_capacity(capacity),
        };
        transposer.set_rate(1.0);
        transposer.clear();
        transposer
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
        design_taps(&mut self.taps, rate);
    }

    pub fn process(&mut self, input: &mut FrameFifo, output: &mut FrameFifo) {
        self.unfiltered.push_slice(input.as_slice());
        input.clear();

        let src = self.unfiltered.as_slice();
        if src.len() >= AA_TAPS {
            let count = src.len() - AA_TAPS + 1;
            for window in src.windows(AA_TAPS) {
                let mut acc = StereoFrame::zero();
                for (&x, &tap) in window.iter().zip(&self.taps) {
                    acc += x * tap;
                }
                self.filtered.push(acc);
            }
            self.unfiltered.discard(count);
        }

        let src = self.filtered.as_slice();
        while self.pos + 1.0 < src.len() as f64 {
            let i = self.pos as usize;
            let t = (self.pos - i as f64) as f32;
            output.push(src[i].lerp(src[i + 1], t));
            self.pos += self.rate;
        }
        let consumed = (self.pos as usize).min(src.len());
        self.filtered.discard(consumed);
        self.pos -= consumed as f64;
    }

    pub fn clear(&mut self) {
        self.pos = 0.0;
        self.filtered.clear();
        self.unfiltered.clear();
        // history so the first real frame lands on the filter center
        self.unfiltered.push_silence(CENTER);
    }
}

// Windowed-sinc lowpass at 0.5/rate cycles per sample; a unit impulse when
// the rate does not decimate.
fn design_taps(taps: &mut [f32; AA_TAPS], rate: f64) {
    taps.fill(0.0);
    if rate <= 1.0 {
        taps[CENTER] = 1.0;
        return;
    }

    let cutoff = 0.5 / rate;
    let mut sum = 0.0;
    let mut coeffs = [0.0f64; AA_TAPS];
    for (i, c) in coeffs.iter_mut().enumerate() {
        let n = i as f64 - CENTER as f64;
        let sinc = if n == 0.0 {
            2.0 * cutoff
        } else {
            (TAU * cutoff * n).sin() / (PI * n)
        };
        let hamming = 0.54 - 0.46 * (TAU * i as f64 / (AA_TAPS - 1) as f64).cos();
        *c = sinc * hamming;
        sum += *c;
    }
    for (tap, c) in taps.iter_mut().zip(coeffs) {
        *tap = (c / sum) as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ramp(n: usize) -> Vec<StereoFrame> {
        (0..n).map(|i| StereoFrame::new(i as f32, i as f32 * 0.5)).collect()
    }

    fn run(rate: f64, input: &[StereoFrame]) -> Vec<StereoFrame> {
        let mut t = Transposer::new(input.len());
        t.set_rate(rate);
        let mut fifo = FrameFifo::with_capacity(input.len());
        let mut out = FrameFifo::with_capacity(input.len() * 3);
        fifo.push_slice(input);
        t.process(&mut fifo, &mut out);
        out.as_slice().to_vec()
    }

    #[test]
    fn unit_rate_is_exact_passthrough() {
        let input = ramp(200);
        let out = run(1.0, &input);
        assert!(!out.is_empty());
        for (o, i) in out.iter().zip(&input) {
            assert_eq!(o, i);
        }
    }

    #[test]
    fn half_rate_interpolates_between_frames() {
        let input = ramp(100);
        let out = run(0.5, &input);
        assert_abs_diff_eq!(out[1].left, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(out[3].left, 1.5, epsilon = 1e-6);
        assert!(out.len() > 120);
    }

    #[test]
    fn decimating_taps_are_a_normalized_lowpass() {
        let mut taps = [0.0; AA_TAPS];
        design_taps(&mut taps, 2.0);
        let sum: f32 = taps.iter().sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-5);
        assert!(taps[CENTER] > taps[0].abs());
        // symmetric
        assert_abs_diff_eq!(taps[CENTER - 3], taps[CENTER + 3], epsilon = 1e-7);
    }

    #[test]
    fn double_rate_halves_length() {
        let input = ramp(1000);
        let out = run(2.0, &input).len();
        assert!((480..=500).contains(&out), "len {out}");
    }
}
