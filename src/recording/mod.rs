//! Clip recording.
//!
//! A session owns at most one open clip. Clips are written to a
//! temporary file, then moved to a time-stamped destination once the
//! post-roll has elapsed or the input ends.

mod finalize;
mod naming;
mod session;
mod snapshot;

use crate::media::SinkError;
use std::path::PathBuf;
use thiserror::Error;

pub use finalize::{move_file, MoveMethod};
pub use naming::ClipNamer;
pub use session::{ActiveClip, ClipSummary, RecordingSession, SessionState, Transition};
pub use snapshot::{difference_snapshot_path, snapshot_path, write_difference_snapshot, write_luma_snapshot};

/// Errors that can occur while recording a clip.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The temporary clip file could not be created.
    #[error("failed to create temporary clip in {}: {source}", .dir.display())]
    TempFile {
        /// Temporary directory.
        dir: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The destination directory could not be created.
    #[error("failed to create clip directory {}: {source}", .path.display())]
    CreateDir {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The clip sink failed.
    #[error("clip output failed: {0}")]
    Sink(#[from] SinkError),

    /// Neither rename nor copy could place the clip.
    #[error("failed to move clip {} to {}: {source}", .from.display(), .to.display())]
    Move {
        /// Temporary clip file.
        from: PathBuf,
        /// Intended destination.
        to: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A snapshot image could not be written.
    #[error("failed to write snapshot {}: {source}", .path.display())]
    Snapshot {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
