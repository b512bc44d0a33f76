//! Bounded buffers.
//!
//! The recorder keeps two rings: a large pre-roll ring of shared frames,
//! replayed into a clip when recording starts, and a small window of
//! per-frame motion decisions used by the classifier.

mod ring;

pub use ring::{BoundedRing, Iter, ReleaseFn};
