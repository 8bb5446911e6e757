//! WSOLA tempo change.
//!
//! Input is cut into sequences of `sequence` frames. Each new sequence is
//! placed where it best lines up with the tail of the previous one (searched
//! over `seek` candidate offsets by cross-correlation), cross-faded over
//! `overlap` frames, and the read position then advances by the nominal skip
//! `tempo * (sequence - overlap)`. Output length is input length / tempo,
//! pitch is untouched.

use crate::audio::fifo::FrameFifo;
use crate::audio::frame::StereoFrame;
use crate::config::StretchConfig;

pub struct Stretch {
    tempo: f64,
    sequence: usize,
    seek: usize,
    overlap: usize,
    nominal_skip: f64,
    skip_fract: f64,
    sample_req: usize,
    tail: Vec<StereoFrame>, // last `overlap` frames of the previous sequence
    reference: Vec<f32>,    // mono tail with slope weighting, what the seek correlates against
    at_start: bool,
}

impl Stretch {
    pub fn new(sample_rate: u32, config: &StretchConfig) -> Self {
        let frames = |ms: f32| ((sample_rate as f32 * ms / 1000.0).round() as usize).max(1);
        let overlap = frames(config.overlap_ms);
        let sequence = frames(config.sequence_ms).max(2 * overlap + 1);
        let seek = frames(config.seek_ms);

        let mut stretch = Self {
            tempo: 1.0,
            sequence,
            seek,
            overlap,
            nominal_skip: 0.0,
            skip_fract: 0.0,
            sample_req: 0,
            tail: vec![StereoFrame::zero(); overlap],
            reference: vec![0.0; overlap],
            at_start: true,
        };
        stretch.set_tempo(1.0);
        stretch
    }

    pub fn set_tempo(&mut self, tempo: f64) {
        self.tempo = tempo;
        self.nominal_skip = tempo * (self.sequence - self.overlap) as f64;
        let int_skip = (self.nominal_skip + 0.5) as usize;
        self.sample_req = (int_skip + self.overlap).max(self.sequence) + self.seek;
    }

    /// Input frames that must be queued before one sequence can be emitted.
    pub fn sample_req(&self) -> usize {
        self.sample_req
    }

    pub fn process(&mut self, input: &mut FrameFifo, output: &mut FrameFifo) {
        let ovl = self.overlap;
        let body_end = self.sequence - ovl;

        while input.len() >= self.sample_req {
            // unity tempo keeps sequences contiguous, so there is nothing to search for
            let offset = if self.at_start || self.tempo == 1.0 {
                0
            } else {
                self.best_offset(input.as_slice())
            };

            let seq = &input.as_slice()[offset..offset + self.sequence];
            if self.at_start {
                output.push_slice(&seq[..ovl]);
                self.at_start = false;
            } else {
                let step = 1.0 / ovl as f32;
                for (i, (&old, &new)) in self.tail.iter().zip(seq).enumerate() {
                    output.push(old.lerp(new, i as f32 * step));
                }
            }
            output.push_slice(&seq[ovl..body_end]);
            self.tail.copy_from_slice(&seq[body_end..]);
            self.update_reference();

            self.skip_fract += self.nominal_skip;
            let skip = self.skip_fract as usize;
            self.skip_fract -= skip as f64;
            input.discard(skip);
        }
    }

    pub fn clear(&mut self) {
        self.tail.fill(StereoFrame::zero());
        self.reference.fill(0.0);
        self.skip_fract = 0.0;
        self.at_start = true;
    }

    fn update_reference(&mut self) {
        let ovl = self.overlap;
        for (i, (r, f)) in self.reference.iter_mut().zip(&self.tail).enumerate() {
            *r = f.mono() * (i * (ovl - i)) as f32;
        }
    }

    // Offset in [0, seek) whose start correlates best with the previous tail.
    fn best_offset(&self, src: &[StereoFrame]) -> usize {
        let mut best = 0;
        let mut best_corr = f32::MIN;
        for offset in 0..self.seek {
            let candidate = &src[offset..offset + self.overlap];
            let mut corr = 0.0f32;
            let mut norm = 0.0f32;
            for (&r, f) in self.reference.iter().zip(candidate) {
                let m = f.mono();
                corr += r * m;
                norm += m * m;
            }
            let corr = corr / (norm + 1e-9).sqrt();
            if corr > best_corr {
                best_corr = corr;
                best = offset;
            }
        }
        best
    }
}
