//! Offline rendering: run a whole file through a session graph and write the
//! result to disk instead of the sound card.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::audio::{AudioBuffer, SessionGraph, SessionParams, StereoFrame};
use crate::config::Config;

const BLOCK: usize = 1024;

/// Pitch-shifts and gains `buffer` at its own sample rate. The result has
/// exactly as many frames as the input.
pub fn render_buffer(buffer: Arc<AudioBuffer>, params: SessionParams, config: &Config) -> Vec<StereoFrame> {
    let len = buffer.len();
    let rate = buffer.sample_rate;
    let mut graph = SessionGraph::new(buffer, rate, params, config);

    let mut out = Vec::with_capacity(len + BLOCK);
    let mut block = vec![StereoFrame::zero(); BLOCK];
    loop {
        let done = graph.render(&mut block);
        out.extend_from_slice(&block);
        if done || out.len() >= len + BLOCK {
            break;
        }
    }
    out.truncate(len);
    out
}

pub fn render_file(input: &Path, output: &Path, params: SessionParams, config: &Config) -> anyhow::Result<()> {
    let buffer = AudioBuffer::load_wav(input)
        .with_context(|| format!("failed to decode {}", input.display()))?;
    let rate = buffer.sample_rate;
    let channels = buffer.channels.clamp(1, 2);
    log::info!(
        "rendering {} ({} frames) at {:+.1} st",
        input.display(),
        buffer.len(),
        params.semitones
    );

    let frames = render_buffer(Arc::new(buffer), params, config);
    write_wav(output, &frames, rate, channels)
        .with_context(|| format!("failed to write {}", output.display()))?;
    Ok(())
}

// 32-bit float, mono files stay mono
fn write_wav(path: &Path, frames: &[StereoFrame], sample_rate: u32, channels: u16) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for f in frames {
        if channels == 1 {
            writer.write_sample(f.mono())?;
        } else {
            writer.write_sample(f.left)?;
            writer.write_sample(f.right)?;
        }
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn ramp(frames: usize) -> AudioBuffer {
        let data = (0..frames)
            .map(|i| {
                let v = ((i % 200) as f32 / 100.0) - 1.0;
                StereoFrame::new(v, -v)
            })
            .collect();
        AudioBuffer::new(22050, 2, data)
    }

    #[test]
    fn unshifted_render_is_the_input() {
        let buffer = Arc::new(ramp(5000));
        let out = render_buffer(buffer.clone(), SessionParams::default(), &Config::default());
        assert_eq!(out.len(), 5000);
        for (o, i) in out.iter().zip(&buffer.data) {
            assert_relative_eq!(o.left, i.left, epsilon = 1e-5);
            assert_relative_eq!(o.right, i.right, epsilon = 1e-5);
        }
    }

    #[test]
    fn shifted_render_keeps_length() {
        let params = SessionParams { semitones: 7.0, ..SessionParams::default() };
        let out = render_buffer(Arc::new(ramp(20000)), params, &Config::default());
        assert_eq!(out.len(), 20000);
        assert!(out.iter().any(|f| f.left.abs() > 0.1));
    }

    #[test]
    fn writes_float_wav() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&input, spec).unwrap();
        for i in 0..3000 {
            writer.write_sample(if i % 40 < 20 { 8192i16 } else { -8192 }).unwrap();
        }
        writer.finalize().unwrap();

        let params = SessionParams { master: 0.5, ..SessionParams::default() };
        render_file(&input, &output, params, &Config::default()).unwrap();

        let mut reader = hound::WavReader::open(&output).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 8000);
        assert_eq!(spec.sample_format, hound::SampleFormat::Float);
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 3000);
        assert_relative_eq!(samples[0], 0.125, epsilon = 1e-6);
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = render_file(
            &dir.path().join("nope.wav"),
            &dir.path().join("out.wav"),
            SessionParams::default(),
            &Config::default(),
        );
        assert!(result.is_err());
    }
}
