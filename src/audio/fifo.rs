use super::frame::StereoFrame;

/// First-in first-out queue of frames.
///
/// Backed by a `Vec` reserved up front; reads drain from the front so the
/// steady state never reallocates as long as the queue stays under its
/// initial capacity.
#[derive(Clone, Debug)]
pub struct FrameFifo {
    frames: Vec<StereoFrame>,
}

impl FrameFifo {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn as_slice(&self) -> &[StereoFrame] {
        &self.frames
    }

    pub fn push(&mut self, frame: StereoFrame) {
        self.frames.push(frame);
    }

    pub fn push_slice(&mut self, src: &[StereoFrame]) {
        self.frames.extend_from_slice(src);
    }

    pub fn push_silence(&mut self, n: usize) {
        self.frames.resize(self.frames.len() + n, StereoFrame::zero());
    }

    /// Moves up to `dest.len()` frames from the front into `dest`, returns how many.
    pub fn take_into(&mut self, dest: &mut [StereoFrame]) -> usize {
        let n = dest.len().min(self.frames.len());
        dest[..n].copy_from_slice(&self.frames[..n]);
        self.discard(n);
        n
    }

    pub fn discard(&mut self, n: usize) {
        let n = n.min(self.frames.len());
        self.frames.drain(..n);
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<StereoFrame> {
        (0..n).map(|i| StereoFrame::new(i as f32, -(i as f32))).collect()
    }

    #[test]
    fn take_into_reads_in_order_and_keeps_the_rest() {
        let mut fifo = FrameFifo::with_capacity(16);
        fifo.push_slice(&ramp(10));

        let mut out = [StereoFrame::zero(); 4];
        assert_eq!(fifo.take_into(&mut out), 4);
        assert_eq!(out[3].left, 3.0);
        assert_eq!(fifo.len(), 6);
        assert_eq!(fifo.as_slice()[0].left, 4.0);
    }

    #[test]
    fn take_into_stops_at_available_frames() {
        let mut fifo = FrameFifo::with_capacity(4);
        fifo.push_slice(&ramp(2));
        let mut out = [StereoFrame::new(9.0, 9.0); 5];
        assert_eq!(fifo.take_into(&mut out), 2);
        assert!(fifo.is_empty());
        // untouched beyond what was read
        assert_eq!(out[2].left, 9.0);
    }

    #[test]
    fn discard_saturates() {
        let mut fifo = FrameFifo::with_capacity(4);
        fifo.push_silence(3);
        fifo.discard(10);
        assert!(fifo.is_empty());
    }
}
