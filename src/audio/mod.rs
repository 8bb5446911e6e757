use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

use crate::audio_api::{AudioCommand, AudioOutput, EngineEvent};
use crate::error::Error;

mod engine;
mod fifo;
mod filter;
mod frame;
mod gain;
mod sample_buffer;
mod session;
mod session_id;
pub mod shifter;
mod source;

pub use engine::Engine;
pub use fifo::FrameFifo;
pub use filter::{Delivery, PitchPipe};
pub use frame::StereoFrame;
pub use gain::{db_to_linear, Effect, Gain, GainChain, GainStage};
pub use sample_buffer::AudioBuffer;
pub use session::{SessionGraph, SessionParams};
pub use session_id::SessionId;
pub use shifter::{semitone_ratio, PitchShifter};
pub use source::{BufferSource, FrameSource, Pull};

pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    events_rx: Receiver<EngineEvent>,
    sample_rate: u32,
    stream: cpal::Stream,
}

impl AudioOutput for AudioHandle {
    fn send(&mut self, cmd: AudioCommand) -> Result<(), AudioCommand> {
        self.tx.try_send(cmd).map_err(|e| {
            log::warn!("engine command queue full");
            e.into_inner()
        })
    }

    fn suspend(&mut self) -> Result<(), Error> {
        self.stream
            .pause()
            .map_err(|e| Error::EngineUnavailable(e.to_string()))
    }

    fn resume(&mut self) -> Result<(), Error> {
        self.stream
            .play()
            .map_err(|e| Error::EngineUnavailable(e.to_string()))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn poll_event(&mut self) -> Option<EngineEvent> {
        self.events_rx.try_recv().ok()
    }
}

/// Opens the default output device. The stream starts suspended; nothing is
/// pulled until `resume`.
pub fn start_audio(
    command_capacity: usize,
    tap: rtrb::Producer<f32>,
) -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(command_capacity);
    let (events_tx, events_rx) = crossbeam_channel::bounded::<EngineEvent>(64);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let config = device.default_output_config().context("no default output config")?;

    let sample_rate: u32 = config.sample_rate().into();
    let channels = config.channels() as usize;
    log::info!("output device: {sample_rate} Hz, {channels} channel(s)");

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let engine = Engine::new(Some(tap), events_tx);
            let stream = build_output_stream_f32(&device, &config.config(), rx, engine, channels)?;
            Ok(AudioHandle {
                tx,
                events_rx,
                sample_rate,
                stream,
            })
        }
        other => anyhow::bail!("unsupported sample format {other:?} (only f32 supported for now)"),
    }
}

// ── Output stream ─────────────────────────────────────────────────

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    mut engine: Engine,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let err_fn = |err| log::error!("audio output stream error: {err}");
    let mut block: Vec<StereoFrame> = Vec::with_capacity(8192);

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info| {
                while let Ok(cmd) = rx.try_recv() { // parameter changes land on this block boundary
                    engine.handle_cmd(cmd);
                }

                let n_frames = data.len() / channels.max(1);
                block.resize(n_frames, StereoFrame::zero()); // only grows if the device asks for more
                engine.render_block(&mut block);
                write_interleaved(&block, data, channels);
            },
            err_fn,
            None,
        )
        .context("failed to build output stream")?;

    Ok(stream)
}

// Mono devices get the average, channels past the second get silence.
fn write_interleaved(block: &[StereoFrame], data: &mut [f32], channels: usize) {
    match channels {
        0 => {}
        1 => {
            for (out, f) in data.iter_mut().zip(block) {
                *out = f.mono();
            }
        }
        _ => {
            for (chunk, f) in data.chunks_exact_mut(channels).zip(block) {
                chunk[0] = f.left;
                chunk[1] = f.right;
                chunk[2..].fill(0.0);
            }
        }
    }
}
