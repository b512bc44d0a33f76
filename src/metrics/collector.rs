//! Metrics collection and registry.

use crate::dispatch::RunStats;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registering or encoding a metric failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of recorder state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Video frames pulled from the input.
    pub video_frames: u64,
    /// Audio frames pulled from the input.
    pub audio_frames: u64,
    /// Video frames whose difference passed the pixel threshold.
    pub interesting_frames: u64,
    /// Manual triggers consumed.
    pub manual_triggers: u64,
    /// Whether the latest frame was motion-active.
    pub motion_active: bool,
    /// Whether a clip is open.
    pub recording: bool,
    /// Clips opened.
    pub clips_started: u64,
    /// Clips finalized and moved into place.
    pub clips_finished: u64,
    /// Frames currently held for pre-roll.
    pub preroll_frames: usize,
    /// Frames evicted from a full pre-roll buffer.
    pub preroll_evictions: u64,
    /// Differing pixels in the latest classified frame.
    pub differing_pixels: u32,
}

impl MetricsSnapshot {
    /// Creates a snapshot from dispatcher statistics.
    pub fn from_stats(stats: &RunStats) -> Self {
        Self {
            video_frames: stats.video_frames,
            audio_frames: stats.audio_frames,
            interesting_frames: stats.interesting_frames,
            manual_triggers: stats.manual_triggers,
            motion_active: stats.motion_active,
            recording: stats.recording,
            clips_started: stats.clips_started,
            clips_finished: stats.clips_finished,
            preroll_frames: stats.preroll_frames,
            preroll_evictions: stats.preroll_evictions,
            differing_pixels: stats.last_differing_pixels,
        }
    }
}

/// Prometheus metrics registry for the recorder.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,

    // Input
    video_frames_total: IntCounter,
    audio_frames_total: IntCounter,

    // Detection
    interesting_frames_total: IntCounter,
    manual_triggers_total: IntCounter,
    motion_active: IntGauge,
    differing_pixels: IntGauge,

    // Recording
    recording_active: IntGauge,
    clips_started_total: IntCounter,
    clips_finished_total: IntCounter,

    // Pre-roll
    preroll_frames: IntGauge,
    preroll_evictions_total: IntCounter,
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

impl MetricsRegistry {
    /// Creates a new registry with all recorder metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let video_frames_total = IntCounter::new(
            "motion_recorder_video_frames_total",
            "Video frames read from the input",
        )?;
        let audio_frames_total = IntCounter::new(
            "motion_recorder_audio_frames_total",
            "Audio frames read from the input",
        )?;

        let interesting_frames_total = IntCounter::new(
            "motion_recorder_interesting_frames_total",
            "Video frames with enough differing pixels to count as interesting",
        )?;
        let manual_triggers_total = IntCounter::new(
            "motion_recorder_manual_triggers_total",
            "Manual recording triggers consumed",
        )?;
        let motion_active = IntGauge::new(
            "motion_recorder_motion_active",
            "Whether motion is currently active (1=active, 0=idle)",
        )?;
        let differing_pixels = IntGauge::new(
            "motion_recorder_differing_pixels",
            "Differing pixels in the most recently classified frame",
        )?;

        let recording_active = IntGauge::new(
            "motion_recorder_recording_active",
            "Whether a clip is being recorded (1=recording, 0=idle)",
        )?;
        let clips_started_total = IntCounter::new(
            "motion_recorder_clips_started_total",
            "Clips started",
        )?;
        let clips_finished_total = IntCounter::new(
            "motion_recorder_clips_finished_total",
            "Clips finalized and moved to their destination",
        )?;

        let preroll_frames = IntGauge::new(
            "motion_recorder_preroll_frames",
            "Frames currently held in the pre-roll buffer",
        )?;
        let preroll_evictions_total = IntCounter::new(
            "motion_recorder_preroll_evictions_total",
            "Frames evicted from the full pre-roll buffer",
        )?;

        registry.register(Box::new(video_frames_total.clone()))?;
        registry.register(Box::new(audio_frames_total.clone()))?;
        registry.register(Box::new(interesting_frames_total.clone()))?;
        registry.register(Box::new(manual_triggers_total.clone()))?;
        registry.register(Box::new(motion_active.clone()))?;
        registry.register(Box::new(differing_pixels.clone()))?;
        registry.register(Box::new(recording_active.clone()))?;
        registry.register(Box::new(clips_started_total.clone()))?;
        registry.register(Box::new(clips_finished_total.clone()))?;
        registry.register(Box::new(preroll_frames.clone()))?;
        registry.register(Box::new(preroll_evictions_total.clone()))?;

        Ok(Self {
            registry,
            video_frames_total,
            audio_frames_total,
            interesting_frames_total,
            manual_triggers_total,
            motion_active,
            differing_pixels,
            recording_active,
            clips_started_total,
            clips_finished_total,
            preroll_frames,
            preroll_evictions_total,
        })
    }

    /// Updates all metrics from a snapshot of recorder state.
    ///
    /// Counters only move forward; a snapshot behind the current value
    /// leaves them unchanged.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        advance(&self.video_frames_total, snapshot.video_frames);
        advance(&self.audio_frames_total, snapshot.audio_frames);

        advance(&self.interesting_frames_total, snapshot.interesting_frames);
        advance(&self.manual_triggers_total, snapshot.manual_triggers);
        self.motion_active.set(i64::from(snapshot.motion_active));
        self.differing_pixels.set(i64::from(snapshot.differing_pixels));

        self.recording_active.set(i64::from(snapshot.recording));
        advance(&self.clips_started_total, snapshot.clips_started);
        advance(&self.clips_finished_total, snapshot.clips_finished);

        self.preroll_frames.set(snapshot.preroll_frames as i64);
        advance(&self.preroll_evictions_total, snapshot.preroll_evictions);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
