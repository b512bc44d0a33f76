//! Moving finished clips into place.

use super::SessionError;
use std::fs;
use std::io;
use std::path::Path;

/// How a clip reached its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMethod {
    /// A plain rename.
    Renamed,
    /// The rename failed (for example across filesystems) and the file
    /// was copied, then the original removed.
    Copied,
}

/// Moves `from` to `to`, falling back to copy-then-delete.
///
/// A failed fallback copy is an error. Failing to remove the original
/// after a successful copy is only logged.
pub fn move_file(from: &Path, to: &Path) -> Result<MoveMethod, SessionError> {
    move_with(from, to, |from, to| fs::rename(from, to))
}

fn move_with(
    from: &Path,
    to: &Path,
    rename: impl FnOnce(&Path, &Path) -> io::Result<()>,
) -> Result<MoveMethod, SessionError> {
    let rename_error = match rename(from, to) {
        Ok(()) => return Ok(MoveMethod::Renamed),
        Err(e) => e,
    };

    tracing::warn!(
        from = %from.display(),
        to = %to.display(),
        error = %rename_error,
        "Rename failed; copying clip instead"
    );

    fs::copy(from, to).map_err(|source| SessionError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })?;

    if let Err(e) = fs::remove_file(from) {
        tracing::warn!(path = %from.display(), error = %e, "Failed to remove temporary clip");
    }

    Ok(MoveMethod::Copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_within_directory() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("clip.tmp");
        let to = dir.path().join("clip.y4m");
        fs::write(&from, b"frames").unwrap();

        assert_eq!(move_file(&from, &to).unwrap(), MoveMethod::Renamed);
        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"frames");
    }

    fn cross_device(_: &Path, _: &Path) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "cross-device link"))
    }

    #[test]
    fn test_copy_fallback_when_rename_fails() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("clip.tmp");
        let to = dir.path().join("clip.y4m");
        fs::write(&from, b"YUV4MPEG2 frames").unwrap();

        assert_eq!(move_with(&from, &to, cross_device).unwrap(), MoveMethod::Copied);
        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"YUV4MPEG2 frames");
    }

    #[test]
    fn test_failed_fallback_copy_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("clip.tmp");
        fs::write(&from, b"frames").unwrap();

        let result = move_with(&from, &dir.path().join("absent").join("clip.y4m"), cross_device);
        assert!(matches!(result, Err(SessionError::Move { .. })));
        assert!(from.exists());
    }

    #[test]
    fn test_missing_source_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = move_file(&dir.path().join("gone"), &dir.path().join("clip.y4m"));

        assert!(matches!(result, Err(SessionError::Move { .. })));
    }
}
