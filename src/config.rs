// Runtime configuration, read once at startup from an optional JSON file.
// Every field has a default so a partial file (or none at all) is fine.
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub pull_frames: usize,      // frames pulled from the source per refill
    pub pitch_range: f32,        // semitones either side of 0 the shifter accepts
    pub stretch: StretchConfig,
    pub analysis: AnalysisConfig,
    pub tick_ms: u64,            // UI/refresh loop period
    pub tap_capacity: usize,     // analysis ring size in samples
    pub command_capacity: usize, // engine command channel bound
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pull_frames: 4096,
            pitch_range: 24.0,
            stretch: StretchConfig::default(),
            analysis: AnalysisConfig::default(),
            tick_ms: 16, // ~60fps
            tap_capacity: 8192,
            command_capacity: 1024,
        }
    }
}

/// WSOLA timing, in milliseconds.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct StretchConfig {
    pub sequence_ms: f32,
    pub seek_ms: f32,
    pub overlap_ms: f32,
}

impl Default for StretchConfig {
    fn default() -> Self {
        Self {
            sequence_ms: 40.0,
            seek_ms: 15.0,
            overlap_ms: 8.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub fft_size: usize,
    pub smoothing: f32,
    pub min_db: f32,
    pub max_db: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: 512,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fft = self.analysis.fft_size;
        if fft < 32 || !fft.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "analysis.fft_size must be a power of two >= 32, got {fft}"
            )));
        }
        if self.analysis.min_db >= self.analysis.max_db {
            return Err(ConfigError::Invalid("analysis.min_db must be below max_db".into()));
        }
        if !(0.0..1.0).contains(&self.analysis.smoothing) {
            return Err(ConfigError::Invalid("analysis.smoothing must be in [0, 1)".into()));
        }
        let s = self.stretch;
        if s.overlap_ms <= 0.0 || s.seek_ms <= 0.0 || s.sequence_ms < 2.0 * s.overlap_ms {
            return Err(ConfigError::Invalid(
                "stretch.sequence_ms must be at least twice overlap_ms, all positive".into(),
            ));
        }
        if !(self.pitch_range > 0.0 && self.pitch_range <= 48.0) {
            return Err(ConfigError::Invalid("pitch_range must be in (0, 48]".into()));
        }
        if self.pull_frames == 0 || self.tap_capacity == 0 || self.command_capacity == 0 {
            return Err(ConfigError::Invalid("buffer sizes must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "pitch_range": 12.0, "stretch": {{ "overlap_ms": 10.0 }} }}"#).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.pitch_range, 12.0);
        assert_eq!(config.stretch.overlap_ms, 10.0);
        assert_eq!(config.stretch.sequence_ms, 40.0);
        assert_eq!(config.analysis, AnalysisConfig::default());
    }

    #[test]
    fn rejects_bad_fft_size() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "analysis": {{ "fft_size": 500 }} }}"#).unwrap();
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Json(_))));
    }
}
