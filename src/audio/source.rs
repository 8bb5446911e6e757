use std::sync::Arc;

use super::frame::StereoFrame;
use super::sample_buffer::AudioBuffer;

/// Result of one pull from a [`FrameSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pull {
    pub frames: usize,       // real frames written, the rest of dest is silence
    pub end_of_stream: bool, // no real frames remain after this pull
}

/// Pull-based block reader feeding the pitch pipe.
pub trait FrameSource: Send {
    fn pull(&mut self, dest: &mut [StereoFrame]) -> Pull;
    fn reset(&mut self);
    fn position(&self) -> usize;
}

/// Reads a decoded buffer from a cursor. A source without a buffer is
/// "unready": it yields silence and reports end of stream.
#[derive(Clone, Debug, Default)]
pub struct BufferSource {
    buffer: Option<Arc<AudioBuffer>>,
    cursor: usize,
}

impl BufferSource {
    pub fn new(buffer: Arc<AudioBuffer>) -> Self {
        Self { buffer: Some(buffer), cursor: 0 }
    }

    pub fn unready() -> Self {
        Self::default()
    }
}

impl FrameSource for BufferSource {
    fn pull(&mut self, dest: &mut [StereoFrame]) -> Pull {
        let Some(buffer) = self.buffer.as_ref() else {
            dest.fill(StereoFrame::zero());
            return Pull { frames: 0, end_of_stream: true };
        };

        let data = &buffer.data;
        let start = self.cursor.min(data.len());
        let n = dest.len().min(data.len() - start);
        dest[..n].copy_from_slice(&data[start..start + n]);
        dest[n..].fill(StereoFrame::zero());
        self.cursor = start + n;

        Pull {
            frames: n,
            end_of_stream: self.cursor >= data.len(),
        }
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn position(&self) -> usize {
        self.cursor
    }
}
