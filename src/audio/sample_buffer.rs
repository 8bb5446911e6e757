use std::io::Cursor;
use std::path::Path;

use super::frame::StereoFrame;
use crate::error::DecodeError;

/// A fully decoded file, kept in memory for the lifetime of the loaded file.
#[derive(Clone, Debug)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels: u16, // channel count of the source file; frames are always stereo
    pub data: Vec<StereoFrame>, // the audio data array
}

impl AudioBuffer {
    pub fn new(sample_rate: u32, channels: u16, data: Vec<StereoFrame>) -> Self {
        Self { sample_rate, channels, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.data.len() as f64 / self.sample_rate.max(1) as f64
    }

    // Load a WAV file from disk
    pub fn load_wav(path: &Path) -> Result<Self, DecodeError> {
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes)
    }

    /// Decodes raw WAV bytes. Mono is duplicated to both sides, anything past
    /// the second channel is dropped.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();
        let channels = spec.channels as usize;
        if channels == 0 {
            return Err(DecodeError::UnsupportedFormat("zero channels".into()));
        }

        // Read the samples from the WAV file
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader // float, just pass it through
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => { // int, convert to float
                if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                    return Err(DecodeError::UnsupportedFormat(format!(
                        "{}-bit integer PCM",
                        spec.bits_per_sample
                    )));
                }
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let data: Vec<StereoFrame> = if channels == 1 {
            samples
                .into_iter()
                .map(|x| StereoFrame::new(x, x)) // mono, duplicate
                .collect()
        } else {
            samples
                .chunks_exact(channels)
                .map(|c| StereoFrame::new(c[0], c[1]))
                .collect()
        };

        if data.is_empty() {
            return Err(DecodeError::Empty);
        }

        Ok(Self::new(spec.sample_rate, spec.channels, data))
    }
}
