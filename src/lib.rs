//! Motion Recorder Library
//!
//! Watches a live audio/video stream and records clips around motion.
//! A rolling pre-roll buffer means each clip opens a little before the
//! motion began, and a post-roll keeps recording for a while after it
//! stopped.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! media::Source → dispatch → detection (video only)
//!                    ↓            ↓
//!               buffer (pre-roll) → recording → media::Sink
//! ```
//!
//! # Design Principles
//!
//! - **Stream time, not wall time**: post-roll is measured in frame
//!   timestamps, so slow processing never shortens a clip
//! - **Fail fast**: decode, encode and move failures stop the recorder
//!   rather than risk a silently corrupt clip
//! - **Bounded memory**: the pre-roll buffer is allocated once
//!
//! # Example
//!
//! ```no_run
//! use motion_recorder::{
//!     config::FileConfig,
//!     dispatch::Dispatcher,
//!     media::{open_source, SyntheticConfig},
//! };
//!
//! let config = FileConfig::default();
//! let source = open_source("synthetic:duration=30,motion=5-8", &SyntheticConfig::default()).unwrap();
//!
//! let mut dispatcher = Dispatcher::new(source, "clips", config.detection, &config.recording);
//! let stats = dispatcher.run().unwrap();
//! println!("{} clips recorded", stats.clips_finished);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod buffer;
pub mod config;
pub mod detection;
pub mod dispatch;
pub mod media;
pub mod metrics;
pub mod recording;

// Re-export commonly used types at crate root
pub use buffer::BoundedRing;
pub use config::{ConfigError, DetectionConfig, FileConfig, RecordingConfig};
pub use detection::{difference, DifferenceHistogram, MotionClassifier};
pub use dispatch::{DispatchError, Dispatcher, ManualTrigger, ShutdownFlag};
pub use media::{open_source, Frame, Rational, Sink, SinkFactory, Source};
pub use recording::{RecordingSession, SessionError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
