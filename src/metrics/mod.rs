//! Prometheus metrics exporter for the recorder.
//!
//! # Metrics Exposed
//!
//! ## Input
//! - `motion_recorder_video_frames_total` - Video frames read
//! - `motion_recorder_audio_frames_total` - Audio frames read
//!
//! ## Detection
//! - `motion_recorder_interesting_frames_total` - Frames over the pixel threshold
//! - `motion_recorder_manual_triggers_total` - Manual triggers consumed
//! - `motion_recorder_motion_active` - Motion state (1=active, 0=idle)
//! - `motion_recorder_differing_pixels` - Differing pixels in the latest frame
//!
//! ## Recording
//! - `motion_recorder_recording_active` - Clip open (1=recording, 0=idle)
//! - `motion_recorder_clips_started_total` - Clips started
//! - `motion_recorder_clips_finished_total` - Clips moved into place
//!
//! ## Pre-roll
//! - `motion_recorder_preroll_frames` - Frames held for pre-roll
//! - `motion_recorder_preroll_evictions_total` - Frames evicted from the full buffer
//!
//! The HTTP exporter (`/metrics` and `/health`) needs the `metrics`
//! feature; the registry itself is always available.

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
