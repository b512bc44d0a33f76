//! Synthetic scene generator.
//!
//! Produces a deterministic camera-like stream without any decoding:
//! a gradient background with seeded sensor noise, a burned-in clock in
//! the top overlay band, a bright block moving across the frame during
//! configured motion windows, and a quiet audio tone interleaved by
//! timestamp. Useful for demos and for exercising the recorder without
//! real footage.

use super::sink::{AudioParams, Sink, SinkError, SinkFactory, VideoParams};
use super::source::{Source, SourceError};
use super::y4m::{Y4mSink, Y4M_EXTENSION};
use super::{AudioSamples, Frame, PixelFormat, Rational, VideoPicture};
use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;

/// Scheme prefix selecting the synthetic source.
pub const SYNTHETIC_SCHEME: &str = "synthetic";

const VIDEO_TIME_BASE: Rational = Rational::new(1, 90_000);
const BLOCK_SIZE: usize = 48;
const BLOCK_SPEED_PX_PER_SEC: f64 = 80.0;
const CLOCK_ROWS: std::ops::Range<usize> = 4..20;

/// Interval of simulated motion, in seconds from stream start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionWindow {
    /// Start of motion.
    pub start_secs: f64,
    /// End of motion, exclusive.
    pub end_secs: f64,
}

impl MotionWindow {
    fn contains(&self, t: f64) -> bool {
        t >= self.start_secs && t < self.end_secs
    }
}

/// Configuration for the synthetic source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Picture width in pixels.
    pub width: u32,
    /// Picture height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
    /// Stream length in seconds.
    pub duration_secs: u64,
    /// Intervals with a moving block in the scene.
    pub motion: Vec<MotionWindow>,
    /// Sensor noise amplitude (luma levels, either direction).
    pub noise: u8,
    /// Noise generator seed.
    pub seed: u64,
    /// Audio sample rate.
    pub sample_rate: u32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            fps: 30,
            duration_secs: 60,
            motion: vec![MotionWindow {
                start_secs: 5.0,
                end_secs: 8.0,
            }],
            noise: 6,
            seed: 0x5eed,
            sample_rate: 48_000,
        }
    }
}

impl SyntheticConfig {
    /// Applies `key=value` overrides from an input specifier such as
    /// `synthetic:duration=30,motion=5-8,motion=20-21,seed=7`.
    ///
    /// Any `motion` key replaces the configured windows.
    pub fn apply_specifier(&mut self, specifier: &str) -> Result<(), SourceError> {
        let fail = |reason: String| SourceError::OpenFailed {
            specifier: specifier.to_string(),
            reason,
        };

        let params = match specifier.split_once(':') {
            Some((SYNTHETIC_SCHEME, params)) => params,
            None if specifier == SYNTHETIC_SCHEME => "",
            _ => return Err(fail("not a synthetic specifier".into())),
        };

        let mut motion = Vec::new();
        for pair in params.split(',').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| fail(format!("expected key=value, got {pair:?}")))?;
            let number = |v: &str| v.parse::<u64>().map_err(|e| fail(format!("{key}: {e}")));
            let dimension = |v: &str| {
                let n = number(v)?;
                u32::try_from(n).map_err(|_| fail(format!("{key}: {n} does not fit in 32 bits")))
            };

            match key {
                "duration" => self.duration_secs = number(value)?,
                "seed" => self.seed = number(value)?,
                "width" => self.width = dimension(value)?,
                "height" => self.height = dimension(value)?,
                "fps" => self.fps = dimension(value)?,
                "noise" => self.noise = number(value)?.min(u8::MAX as u64) as u8,
                "motion" => {
                    let (start, end) = value
                        .split_once('-')
                        .ok_or_else(|| fail(format!("motion window must be START-END, got {value:?}")))?;
                    let secs = |v: &str| v.parse::<f64>().map_err(|e| fail(format!("motion: {e}")));
                    motion.push(MotionWindow {
                        start_secs: secs(start)?,
                        end_secs: secs(end)?,
                    });
                }
                other => return Err(fail(format!("unknown parameter {other:?}"))),
            }
        }

        if !motion.is_empty() {
            self.motion = motion;
        }
        self.validate().map_err(fail)
    }

    fn validate(&self) -> Result<(), String> {
        if self.width < 2 || self.height < 2 {
            return Err("frame must be at least 2x2".into());
        }
        if self.fps == 0 || self.fps > 120 {
            return Err("fps must be 1-120".into());
        }
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        Ok(())
    }

    /// Returns true if `specifier` selects the synthetic source.
    pub fn matches(specifier: &str) -> bool {
        specifier == SYNTHETIC_SCHEME || specifier.starts_with("synthetic:")
    }
}

/// Deterministic generated input.
pub struct SyntheticSource {
    config: SyntheticConfig,
    rng: ChaCha8Rng,
    audio_time_base: Rational,
    samples_per_audio_frame: u32,
    video_frames_total: u64,
    video_index: u64,
    audio_index: u64,
}

impl SyntheticSource {
    /// Validates `config` and prepares the first frames.
    pub fn new(config: SyntheticConfig) -> Result<Self, SourceError> {
        config.validate().map_err(|reason| SourceError::OpenFailed {
            specifier: SYNTHETIC_SCHEME.into(),
            reason,
        })?;

        let samples_per_audio_frame = (config.sample_rate / config.fps).max(1);
        tracing::info!(
            width = config.width,
            height = config.height,
            fps = config.fps,
            duration_secs = config.duration_secs,
            windows = config.motion.len(),
            "Synthetic source opened"
        );

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            audio_time_base: Rational::new(1, config.sample_rate as i32),
            samples_per_audio_frame,
            video_frames_total: config.duration_secs * config.fps as u64,
            video_index: 0,
            audio_index: 0,
            config,
        })
    }

    fn video_pts(&self, index: u64) -> i64 {
        Rational::rescale(index as i64, Rational::new(1, self.config.fps as i32), VIDEO_TIME_BASE)
    }

    fn audio_pts(&self, index: u64) -> i64 {
        index as i64 * self.samples_per_audio_frame as i64
    }

    fn stream_end_pts(&self) -> i64 {
        self.video_pts(self.video_frames_total)
    }

    fn render_video(&mut self, index: u64) -> Frame {
        let (w, h) = (self.config.width as usize, self.config.height as usize);
        let t = index as f64 / self.config.fps as f64;
        let mut picture = VideoPicture::yuv420p(self.config.width, self.config.height);
        let noise = self.config.noise as u32;

        let luma = picture.luma_mut();
        for y in 0..h {
            let row = luma.row_mut(y);
            for (x, sample) in row.iter_mut().enumerate() {
                let base = 60 + ((x + y) * 64 / (w + h)) as i32;
                let jitter = if noise == 0 {
                    0
                } else {
                    (self.rng.next_u32() % (2 * noise + 1)) as i32 - noise as i32
                };
                *sample = (base + jitter).clamp(16, 235) as u8;
            }
        }

        // Burned-in clock: one bar per elapsed second, ten to a band
        let seconds = t as usize;
        let clock_rows = CLOCK_ROWS.start.min(h)..CLOCK_ROWS.end.min(h);
        for y in clock_rows {
            let row = luma.row_mut(y);
            for bar in 0..(seconds % 10) + 1 {
                let start = 8 + bar * 6;
                let end = (start + 4).min(w);
                if start < end {
                    row[start..end].fill(235);
                }
            }
        }

        if let Some(window) = self.config.motion.iter().find(|m| m.contains(t)) {
            let travel = w.saturating_sub(BLOCK_SIZE).max(1);
            let offset = ((t - window.start_secs) * BLOCK_SPEED_PX_PER_SEC) as usize;
            let left = offset % travel;
            let top = (h / 2).saturating_sub(BLOCK_SIZE / 2);

            for y in top..(top + BLOCK_SIZE).min(h) {
                let right = (left + BLOCK_SIZE).min(w);
                luma.row_mut(y)[left..right].fill(235);
            }
        }

        Frame::video(self.video_pts(index), VIDEO_TIME_BASE, picture)
    }

    fn render_audio(&self, index: u64) -> Frame {
        let count = self.samples_per_audio_frame as u64;
        let rate = self.config.sample_rate as f64;
        let data = (0..count)
            .map(|i| {
                let t = (index * count + i) as f64 / rate;
                ((t * 440.0 * std::f64::consts::TAU).sin() * 1000.0) as i16
            })
            .collect();

        Frame::audio(
            self.audio_pts(index),
            self.audio_time_base,
            AudioSamples::new(self.config.sample_rate, 1, data),
        )
    }

    fn video_params(&self) -> VideoParams {
        VideoParams {
            width: self.config.width,
            height: self.config.height,
            format: PixelFormat::Yuv420p,
            frame_rate: Rational::new(self.config.fps as i32, 1),
            time_base: VIDEO_TIME_BASE,
        }
    }

    fn audio_params(&self) -> AudioParams {
        AudioParams {
            sample_rate: self.config.sample_rate,
            channels: 1,
            time_base: self.audio_time_base,
        }
    }
}

impl SinkFactory for SyntheticSource {
    fn create_sink(&self, path: &Path) -> Result<Box<dyn Sink>, SinkError> {
        Ok(Box::new(Y4mSink::create(path, self.video_params(), self.audio_params())?))
    }

    fn sink_extension(&self) -> &'static str {
        Y4M_EXTENSION
    }
}

impl Source for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let end = self.stream_end_pts();
        let video_left = self.video_index < self.video_frames_total;
        let audio_pts = self.audio_pts(self.audio_index);
        let audio_left = Rational::compare_ts(audio_pts, self.audio_time_base, end, VIDEO_TIME_BASE) == Ordering::Less;

        // Audio goes first on ties, as demuxers commonly deliver it
        let take_audio = match (video_left, audio_left) {
            (false, false) => return Ok(None),
            (false, true) => true,
            (true, false) => false,
            (true, true) => {
                let video_pts = self.video_pts(self.video_index);
                Rational::compare_ts(audio_pts, self.audio_time_base, video_pts, VIDEO_TIME_BASE) != Ordering::Greater
            }
        };

        if take_audio {
            let frame = self.render_audio(self.audio_index);
            self.audio_index += 1;
            Ok(Some(frame))
        } else {
            let frame = self.render_video(self.video_index);
            self.video_index += 1;
            Ok(Some(frame))
        }
    }

    fn video_time_base(&self) -> Rational {
        VIDEO_TIME_BASE
    }

    fn audio_time_base(&self) -> Rational {
        self.audio_time_base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;

    fn short_config() -> SyntheticConfig {
        SyntheticConfig {
            width: 64,
            height: 64,
            fps: 10,
            duration_secs: 2,
            motion: Vec::new(),
            ..Default::default()
        }
    }

    #[test]
    fn test_specifier_overrides() {
        let mut config = SyntheticConfig::default();
        config
            .apply_specifier("synthetic:duration=30,motion=5-8,motion=20-21.5,seed=7")
            .unwrap();

        assert_eq!(config.duration_secs, 30);
        assert_eq!(config.seed, 7);
        assert_eq!(config.motion.len(), 2);
        assert_eq!(config.motion[1].end_secs, 21.5);
    }

    #[test]
    fn test_specifier_rejects_unknown_keys() {
        let mut config = SyntheticConfig::default();
        assert!(config.apply_specifier("synthetic:color=red").is_err());
        assert!(config.apply_specifier("rtsp://camera").is_err());
        assert!(config.apply_specifier("synthetic").is_ok());
    }

    #[test]
    fn test_specifier_rejects_oversized_dimensions() {
        let mut config = SyntheticConfig::default();
        let result = config.apply_specifier("synthetic:width=4294967298");

        assert!(matches!(result, Err(SourceError::OpenFailed { .. })));
        assert_eq!(config.width, 320);
    }

    #[test]
    fn test_interleaves_in_timestamp_order() {
        let mut source = SyntheticSource::new(short_config()).unwrap();
        let mut last_seconds = f64::MIN;
        let mut video = 0;
        let mut audio = 0;

        while let Some(frame) = source.next_frame().unwrap() {
            let tb = frame.time_base();
            let seconds = frame.pts() as f64 * tb.num as f64 / tb.den as f64;
            assert!(seconds >= last_seconds);
            last_seconds = seconds;

            match frame.kind() {
                MediaKind::Video => video += 1,
                MediaKind::Audio => audio += 1,
            }
        }

        assert_eq!(video, 20);
        assert_eq!(audio, 20);
    }

    #[test]
    fn test_starts_with_audio_on_tie() {
        let mut source = SyntheticSource::new(short_config()).unwrap();
        let first = source.next_frame().unwrap().unwrap();
        let second = source.next_frame().unwrap().unwrap();

        assert_eq!(first.kind(), MediaKind::Audio);
        assert_eq!(second.kind(), MediaKind::Video);
    }

    #[test]
    fn test_same_seed_same_pictures() {
        let mut a = SyntheticSource::new(short_config()).unwrap();
        let mut b = SyntheticSource::new(short_config()).unwrap();

        for _ in 0..6 {
            assert_eq!(a.next_frame().unwrap(), b.next_frame().unwrap());
        }
    }
}
