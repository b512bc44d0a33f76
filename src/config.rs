//! Recorder configuration.
//!
//! Every section of the TOML file is optional. Defaults reproduce the
//! tuning the detector was developed with: a 40-level noise floor, 30
//! differing pixels per interesting frame, 3 interesting frames out of
//! the last 10, and 10 seconds of post-roll.

use crate::media::SyntheticConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Motion detection tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum luma change for a pixel to count as different.
    pub noise_threshold: u8,
    /// Minimum differing pixels for a frame to be interesting.
    pub min_differing_pixels: u32,
    /// Length of the rolling window of interesting flags.
    pub window_frames: usize,
    /// Interesting frames within the window that make motion active.
    pub min_interesting_frames: usize,
    /// First luma row examined; rows above hold the on-screen clock.
    pub start_row: usize,
    /// Width of each difference histogram bucket.
    pub bucket_width: u8,
    /// Paint a marker into the chroma of interesting frames.
    pub mark_interesting: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            noise_threshold: 40,
            min_differing_pixels: 30,
            window_frames: 10,
            min_interesting_frames: 3,
            start_row: 25,
            bucket_width: 10,
            mark_interesting: true,
        }
    }
}

impl DetectionConfig {
    /// Validates the detection parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket_width == 0 {
            return Err(ConfigError::InvalidBucketWidth);
        }
        if self.window_frames == 0 || self.min_interesting_frames > self.window_frames {
            return Err(ConfigError::InvalidWindow {
                window: self.window_frames,
                required: self.min_interesting_frames,
            });
        }
        Ok(())
    }
}

/// Clip recording behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Seconds of recording kept after the last motion.
    pub post_roll_secs: u64,
    /// Frames (audio and video) kept for pre-roll.
    pub preroll_frames: usize,
    /// Directory for in-progress clips; the system temp dir if unset.
    pub temp_dir: Option<PathBuf>,
    /// Group clips into one directory per local date.
    pub per_day_directories: bool,
    /// Save the triggering frame's luma next to each clip.
    pub snapshots: bool,
    /// Also save the difference map that triggered the clip.
    pub difference_snapshots: bool,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            post_roll_secs: 10,
            preroll_frames: 1300,
            temp_dir: None,
            per_day_directories: true,
            snapshots: true,
            difference_snapshots: false,
        }
    }
}

impl RecordingConfig {
    /// Validates the recording parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preroll_frames == 0 {
            return Err(ConfigError::InvalidPreroll);
        }
        Ok(())
    }

    /// Directory in-progress clips are written to.
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Metrics server port (0 to disable).
    pub port: u16,
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// `bucket_width` was zero.
    #[error("bucket width must be at least 1")]
    InvalidBucketWidth,
    /// The window cannot hold the required interesting frames.
    #[error("invalid motion window: {required} interesting frames required out of {window}")]
    InvalidWindow {
        /// Configured window length.
        window: usize,
        /// Interesting frames required.
        required: usize,
    },
    /// `preroll_frames` was zero.
    #[error("pre-roll buffer must hold at least one frame")]
    InvalidPreroll,
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The config file is not valid TOML for this format.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    /// Motion detection tuning.
    #[serde(default)]
    pub detection: DetectionConfig,
    /// Clip recording behavior.
    #[serde(default)]
    pub recording: RecordingConfig,
    /// Metrics exporter.
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Built-in synthetic input.
    #[serde(default)]
    pub synthetic: SyntheticConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        let config = Self::from_toml(&content)?;
        tracing::info!(path = %path.as_ref().display(), "Loaded configuration");
        Ok(config)
    }

    /// Parses and validates configuration text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detection.validate()?;
        self.recording.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = FileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.detection.noise_threshold, 40);
        assert_eq!(config.recording.post_roll_secs, 10);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = FileConfig::from_toml(
            r#"
            [detection]
            noise_threshold = 25

            [recording]
            post_roll_secs = 4
            temp_dir = "/var/tmp"
            "#,
        )
        .unwrap();

        assert_eq!(config.detection.noise_threshold, 25);
        assert_eq!(config.detection.min_differing_pixels, 30);
        assert_eq!(config.recording.post_roll_secs, 4);
        assert_eq!(config.recording.temp_dir(), PathBuf::from("/var/tmp"));
        assert_eq!(config.recording.preroll_frames, 1300);
    }

    #[test]
    fn test_zero_bucket_width_invalid() {
        let result = FileConfig::from_toml("[detection]\nbucket_width = 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidBucketWidth)));
    }

    #[test]
    fn test_unreachable_motion_window_invalid() {
        let config = DetectionConfig {
            window_frames: 2,
            min_interesting_frames: 3,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWindow { .. })));
    }

    #[test]
    fn test_malformed_toml() {
        let result = FileConfig::from_toml("[recording\npost_roll_secs = 1");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_synthetic_section() {
        let config = FileConfig::from_toml(
            r#"
            [synthetic]
            duration_secs = 5
            motion = [{ start_secs = 1.0, end_secs = 2.0 }]
            "#,
        )
        .unwrap();

        assert_eq!(config.synthetic.duration_secs, 5);
        assert_eq!(config.synthetic.motion.len(), 1);
        assert_eq!(config.synthetic.width, 320);
    }
}
