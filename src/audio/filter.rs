// The pipe between a frame source and the playback engine: pulls fixed-size
// blocks from the source through the pitch shifter and hands out exactly as
// many frames as the caller asks for, keeping the surplus for next time.
use super::frame::StereoFrame;
use super::shifter::PitchShifter;
use super::source::FrameSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub frames: usize,  // real frames at the start of the block, the rest is silence
    pub finished: bool, // the source and the shifter are both exhausted
}

pub struct PitchPipe<S: FrameSource> {
    source: S,
    shifter: PitchShifter,
    scratch: Vec<StereoFrame>,
    fed: u64,
    delivered: u64,
    upstream_done: bool,
}

impl<S: FrameSource> PitchPipe<S> {
    pub fn new(source: S, shifter: PitchShifter, pull_frames: usize) -> Self {
        Self {
            source,
            shifter,
            scratch: vec![StereoFrame::zero(); pull_frames.max(1)],
            fed: 0,
            delivered: 0,
            upstream_done: false,
        }
    }

    /// Fills all of `out`. Once the source has ended, only the frames the
    /// shifter owes for the real input are delivered, then silence.
    pub fn read_output(&mut self, out: &mut [StereoFrame]) -> Delivery {
        while self.shifter.available() < out.len() && !self.upstream_done {
            let pull = self.source.pull(&mut self.scratch);
            if pull.frames > 0 {
                self.shifter.put_samples(&self.scratch[..pull.frames]);
                self.fed += pull.frames as u64;
            }
            if pull.end_of_stream {
                self.upstream_done = true;
                self.shifter.flush();
            } else if pull.frames == 0 {
                break;
            }
        }

        let wanted = if self.upstream_done {
            out.len().min(self.owed() as usize)
        } else {
            out.len()
        };
        let n = self.shifter.receive(&mut out[..wanted]);
        out[n..].fill(StereoFrame::zero());
        self.delivered += n as u64;

        Delivery {
            frames: n,
            finished: self.is_finished(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.upstream_done && (self.owed() == 0 || self.shifter.available() == 0)
    }

    // Output frames still due for the input fed so far.
    fn owed(&self) -> u64 {
        let expected = (self.fed as f64 / self.shifter.base_rate()).round() as u64;
        expected.saturating_sub(self.delivered)
    }

    /// Rewinds the source and empties the shifter.
    pub fn reset(&mut self) {
        self.source.reset();
        self.shifter.clear();
        self.fed = 0;
        self.delivered = 0;
        self.upstream_done = false;
    }

    pub fn position(&self) -> usize {
        self.source.position()
    }

    pub fn shifter(&self) -> &PitchShifter {
        &self.shifter
    }

    pub fn shifter_mut(&mut self) -> &mut PitchShifter {
        &mut self.shifter
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::audio::sample_buffer::AudioBuffer;
    use crate::audio::source::BufferSource;
    use crate::config::StretchConfig;

    const RATE: u32 = 8000;

    fn buffer(n: usize) -> Arc<AudioBuffer> {
        let data = (0..n)
            .map(|i| {
                let s = (std::f32::consts::TAU * 220.0 * i as f32 / RATE as f32).sin() * 0.5;
                StereoFrame::new(s, -s)
            })
            .collect();
        Arc::new(AudioBuffer::new(RATE, 2, data))
    }

    fn pipe(n: usize, semitones: f32, pull: usize) -> PitchPipe<BufferSource> {
        let mut shifter = PitchShifter::new(RATE, 24.0, &StretchConfig::default());
        shifter.set_pitch_semitones(semitones);
        PitchPipe::new(BufferSource::new(buffer(n)), shifter, pull)
    }

    fn read(p: &mut PitchPipe<BufferSource>, n: usize) -> (Vec<StereoFrame>, Delivery) {
        let mut out = vec![StereoFrame::new(9.0, 9.0); n];
        let d = p.read_output(&mut out);
        (out, d)
    }

    #[test]
    fn always_fills_the_requested_block() {
        let mut p = pipe(3000, 3.0, 512);
        for n in [1, 64, 1000, 4096, 7] {
            let (out, _) = read(&mut p, n);
            assert_eq!(out.len(), n);
            assert!(out.iter().all(|f| f.left != 9.0));
        }
    }

    #[test]
    fn split_reads_match_one_read() {
        let mut whole = pipe(5000, 7.0, 1024);
        let (one, _) = read(&mut whole, 256);

        let mut split = pipe(5000, 7.0, 1024);
        let mut joined = Vec::new();
        for n in [64, 64, 128] {
            joined.extend(read(&mut split, n).0);
        }
        assert_eq!(one, joined);
    }

    #[test]
    fn block_boundaries_do_not_lose_or_repeat_frames() {
        let mut whole = pipe(4000, -5.0, 700);
        let (one, _) = read(&mut whole, 5000);

        let mut split = pipe(4000, -5.0, 333);
        let mut joined = Vec::new();
        while joined.len() < 5000 {
            joined.extend(read(&mut split, 97).0);
        }
        joined.truncate(5000);
        assert_eq!(one, joined);
    }

    #[test]
    fn pitch_changes_between_reads_keep_blocks_whole() {
        let mut p = pipe(20000, 0.0, 512);
        let sizes = [1, 97, 512, 4096];
        let pitches = [12.0, -7.0, 3.5, -12.0, 0.0];

        let mut i = 0;
        let mut delivered = 0;
        loop {
            p.shifter_mut().set_pitch_semitones(pitches[i % pitches.len()]);
            let n = sizes[i % sizes.len()];
            let (out, d) = read(&mut p, n);
            assert_eq!(out.len(), n);
            assert!(d.frames <= n);
            assert!(out.iter().all(|f| f.left.is_finite() && f.left.abs() <= 1.0));
            assert!(out[d.frames..].iter().all(|f| *f == StereoFrame::zero()));
            delivered += d.frames;
            i += 1;
            if d.finished {
                break;
            }
            assert!(i < 1000, "pipe never finished");
        }
        assert!(delivered > 0);

        let (out, d) = read(&mut p, 97);
        assert_eq!(d, Delivery { frames: 0, finished: true });
        assert!(out.iter().all(|f| *f == StereoFrame::zero()));
    }

    #[test]
    fn end_of_stream_pads_and_finishes() {
        let mut p = pipe(2000, 0.0, 512);
        let (out, d) = read(&mut p, 3000);
        assert!(d.finished);
        assert_eq!(d.frames, 2000);
        assert!(out[2000..].iter().all(|f| *f == StereoFrame::zero()));

        let (out, d) = read(&mut p, 128);
        assert_eq!(d, Delivery { frames: 0, finished: true });
        assert!(out.iter().all(|f| *f == StereoFrame::zero()));
    }

    #[test]
    fn unshifted_output_equals_source() {
        let source = buffer(1500);
        let mut p = pipe(1500, 0.0, 256);
        let (out, _) = read(&mut p, 1500);
        for (o, i) in out.iter().zip(&source.data) {
            approx::assert_abs_diff_eq!(o.left, i.left, epsilon = 1e-6);
        }
    }

    #[test]
    fn reset_matches_a_fresh_pipe() {
        let mut used = pipe(3000, 4.0, 512);
        read(&mut used, 1800);
        used.reset();
        assert_eq!(used.position(), 0);
        let (after_reset, _) = read(&mut used, 1024);

        let mut fresh = pipe(3000, 4.0, 512);
        let (from_new, _) = read(&mut fresh, 1024);
        assert_eq!(after_reset, from_new);
    }

    #[test]
    fn unready_source_finishes_immediately() {
        let shifter = PitchShifter::new(RATE, 24.0, &StretchConfig::default());
        let mut p = PitchPipe::new(BufferSource::unready(), shifter, 256);
        let mut out = vec![StereoFrame::new(1.0, 1.0); 64];
        let d = p.read_output(&mut out);
        assert_eq!(d, Delivery { frames: 0, finished: true });
        assert!(out.iter().all(|f| *f == StereoFrame::zero()));
    }
}
