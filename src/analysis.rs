//! Waveform and spectrum snapshots of what is playing.
//!
//! The engine pushes post-gain mono samples into an `rtrb` ring; the
//! [`Analyser`] drains it on the UI side into a window of the latest
//! `fft_size` samples and turns that window into byte snapshots on request.
//! Byte scaling follows the browser `AnalyserNode`: time-domain samples map
//! `[-1, 1]` onto `0..=255` around 128, spectrum bins are smoothed magnitudes
//! in dB mapped from `[min_db, max_db]` onto `0..=255`.

use std::f32::consts::TAU;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::config::AnalysisConfig;

/// Both views of the signal at one instant, `fft_size / 2` bytes each.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub time_domain: Vec<u8>,
    pub frequency: Vec<u8>,
}

pub struct Analyser {
    fft_size: usize,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
    tap: Option<rtrb::Consumer<f32>>,
    history: Vec<f32>, // circular, oldest sample at `write`
    write: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    spectrum: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl Analyser {
    pub fn new(config: &AnalysisConfig, tap: Option<rtrb::Consumer<f32>>) -> Self {
        let n = config.fft_size;
        let fft = FftPlanner::new().plan_fft_forward(n);
        Self {
            fft_size: n,
            smoothing: config.smoothing,
            min_db: config.min_db,
            max_db: config.max_db,
            tap,
            history: vec![0.0; n],
            write: 0,
            window: blackman(n),
            fft,
            spectrum: vec![Complex::new(0.0, 0.0); n],
            smoothed: vec![0.0; n / 2],
        }
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Pulls everything the engine has produced since the last call.
    pub fn drain(&mut self) {
        let Some(mut tap) = self.tap.take() else {
            return;
        };
        if let Ok(chunk) = tap.read_chunk(tap.slots()) {
            let (first, second) = chunk.as_slices();
            self.push_samples(first);
            self.push_samples(second);
            chunk.commit_all();
        }
        self.tap = Some(tap);
    }

    pub fn push_samples(&mut self, samples: &[f32]) {
        for &s in samples {
            self.history[self.write] = s;
            self.write = (self.write + 1) % self.fft_size;
        }
    }

    /// Forgets the signal, as after a stop.
    pub fn reset(&mut self) {
        self.history.fill(0.0);
        self.smoothed.fill(0.0);
        self.write = 0;
    }

    // i-th oldest sample of the window
    fn sample(&self, i: usize) -> f32 {
        self.history[(self.write + i) % self.fft_size]
    }

    pub fn time_domain(&self) -> Vec<u8> {
        (0..self.bin_count())
            .map(|i| (128.0 * (1.0 + self.sample(i))).floor().clamp(0.0, 255.0) as u8)
            .collect()
    }

    /// Advances the smoothing state, so call it once per displayed frame.
    pub fn frequency(&mut self) -> Vec<u8> {
        let n = self.fft_size;
        for i in 0..n {
            self.spectrum[i] = Complex::new(self.sample(i) * self.window[i], 0.0);
        }
        self.fft.process(&mut self.spectrum);

        let scale = 255.0 / (self.max_db - self.min_db);
        let mut out = Vec::with_capacity(self.bin_count());
        for (bin, smoothed) in self.spectrum.iter().zip(self.smoothed.iter_mut()) {
            let magnitude = bin.norm() / n as f32;
            *smoothed = self.smoothing * *smoothed + (1.0 - self.smoothing) * magnitude;
            let db = 20.0 * smoothed.log10();
            let byte = if db.is_finite() {
                (scale * (db - self.min_db)).floor().clamp(0.0, 255.0)
            } else {
                0.0
            };
            out.push(byte as u8);
        }
        out
    }

    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot {
            time_domain: self.time_domain(),
            frequency: self.frequency(),
        }
    }
}

fn blackman(n: usize) -> Vec<f32> {
    let (a0, a1, a2) = (0.42, 0.5, 0.08);
    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            a0 - a1 * (TAU * x).cos() + a2 * (2.0 * TAU * x).cos()
        })
        .collect()
}
