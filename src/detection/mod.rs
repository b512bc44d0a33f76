//! Motion detection.
//!
//! Consecutive video frames are differenced on their luma planes, the
//! differences are filtered for noise, and a rolling window of recent
//! per-frame decisions gates the final motion-active signal.

mod classifier;
mod difference;
mod marker;

pub use classifier::{Classification, MotionClassifier};
pub use difference::{difference, difference_frames, DifferenceError, DifferenceHistogram, DifferenceMap};
pub use marker::mark_interesting;
