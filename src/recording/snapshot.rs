//! Still snapshots saved alongside clips.
//!
//! Snapshots are 8-bit grayscale PGM images: the luma plane of the frame
//! that started a clip and, optionally, the difference map behind it.

use super::SessionError;
use crate::detection::DifferenceMap;
use crate::media::VideoPicture;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Snapshot path for the clip at `destination` (`<stem>.pgm`).
pub fn snapshot_path(destination: &Path) -> PathBuf {
    destination.with_extension("pgm")
}

/// Difference snapshot path for the clip at `destination`.
pub fn difference_snapshot_path(destination: &Path) -> PathBuf {
    let stem = destination
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!("{stem}-difference.pgm"))
}

/// Writes the luma plane of `picture`.
pub fn write_luma_snapshot(path: &Path, picture: &VideoPicture) -> Result<(), SessionError> {
    let luma = picture.luma();
    write_pgm(path, luma.width(), luma.height(), (0..luma.height()).map(|y| luma.row(y)))
}

/// Writes a difference map.
pub fn write_difference_snapshot(path: &Path, map: &DifferenceMap) -> Result<(), SessionError> {
    write_pgm(path, map.width(), map.height(), (0..map.height()).map(|y| map.row(y)))
}

fn write_pgm<'a>(
    path: &Path,
    width: usize,
    height: usize,
    rows: impl Iterator<Item = &'a [u8]>,
) -> Result<(), SessionError> {
    let snapshot_error = |source| SessionError::Snapshot {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = BufWriter::new(File::create(path).map_err(snapshot_error)?);
    write!(writer, "P5\n{} {}\n255\n", width, height).map_err(snapshot_error)?;
    for row in rows {
        writer.write_all(row).map_err(snapshot_error)?;
    }
    writer.flush().map_err(snapshot_error)?;

    tracing::debug!(path = %path.display(), width, height, "Wrote snapshot");
    Ok(())
}
