//! Clip file naming.
//!
//! Clips are written to a temporary file and moved to a destination
//! named from the local wall-clock time at which recording started,
//! optionally under a per-day directory.

use super::SessionError;
use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;
use std::path::{Path, PathBuf};

const TEMP_PREFIX: &str = "motion-recorder-";

/// Chooses temporary and final paths for clips.
#[derive(Debug, Clone)]
pub struct ClipNamer {
    output_dir: PathBuf,
    temp_dir: PathBuf,
    per_day: bool,
}

impl ClipNamer {
    /// Namer for clips under `output_dir`, with temp files in `temp_dir`.
    pub fn new(output_dir: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>, per_day: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            temp_dir: temp_dir.into(),
            per_day,
        }
    }

    /// Root of the clip tree.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Destination for a clip starting now; creates its directory.
    pub fn destination(&self, extension: &str) -> Result<PathBuf, SessionError> {
        self.destination_at(&Local::now(), extension)
    }

    /// Destination for a clip starting at `at`; creates its directory.
    ///
    /// Names have one-second resolution. If a clip with the same name
    /// already exists, a numeric suffix is appended.
    pub fn destination_at<Tz>(&self, at: &DateTime<Tz>, extension: &str) -> Result<PathBuf, SessionError>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let dir = if self.per_day {
            self.output_dir.join(at.format("%Y-%m-%d").to_string())
        } else {
            self.output_dir.clone()
        };

        std::fs::create_dir_all(&dir).map_err(|source| SessionError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let stem = at.format("%Y-%m-%dT%H:%M:%S%z").to_string();
        let mut candidate = dir.join(format!("{stem}.{extension}"));
        let mut suffix = 0u32;

        while candidate.exists() {
            suffix += 1;
            candidate = dir.join(format!("{stem}-{suffix}.{extension}"));
        }

        if suffix > 0 {
            tracing::warn!(
                stem = %stem,
                destination = %candidate.display(),
                "Clip name already taken this second; using a suffixed name"
            );
        }

        Ok(candidate)
    }

    /// Creates a fresh temporary clip file and returns its path.
    ///
    /// The file is kept on disk; if the process dies mid-clip it stays
    /// behind as an orphan.
    pub fn temp_file(&self, extension: &str) -> Result<PathBuf, SessionError> {
        let suffix = format!(".{extension}");
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX).suffix(&suffix);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(0o644));
        }

        let temp_error = |source| SessionError::TempFile {
            dir: self.temp_dir.clone(),
            source,
        };

        let file = builder.tempfile_in(&self.temp_dir).map_err(temp_error)?;
        let (_file, path) = file.keep().map_err(|e| temp_error(e.error))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn at() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-06-01T14:03:09+02:00").unwrap()
    }

    #[test]
    fn test_per_day_destination() {
        let dir = tempfile::tempdir().unwrap();
        let namer = ClipNamer::new(dir.path(), dir.path(), true);

        let path = namer.destination_at(&at(), "y4m").unwrap();
        assert_eq!(path, dir.path().join("2024-06-01").join("2024-06-01T14:03:09+0200.y4m"));
        assert!(dir.path().join("2024-06-01").is_dir());
    }

    #[test]
    fn test_flat_destination() {
        let dir = tempfile::tempdir().unwrap();
        let namer = ClipNamer::new(dir.path(), dir.path(), false);

        let path = namer.destination_at(&at(), "y4m").unwrap();
        assert_eq!(path, dir.path().join("2024-06-01T14:03:09+0200.y4m"));
    }

    #[test]
    fn test_same_second_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let namer = ClipNamer::new(dir.path(), dir.path(), false);

        let first = namer.destination_at(&at(), "y4m").unwrap();
        std::fs::write(&first, b"clip").unwrap();

        let second = namer.destination_at(&at(), "y4m").unwrap();
        assert_eq!(second, dir.path().join("2024-06-01T14:03:09+0200-1.y4m"));
    }

    #[test]
    fn test_temp_file_kept() {
        let dir = tempfile::tempdir().unwrap();
        let namer = ClipNamer::new(dir.path().join("out"), dir.path(), true);

        let path = namer.temp_file("y4m").unwrap();
        assert!(path.exists());
        assert_eq!(path.parent(), Some(dir.path()));
        assert!(path.file_name().unwrap().to_string_lossy().starts_with(TEMP_PREFIX));
        assert_eq!(path.extension().unwrap(), "y4m");
    }

    #[test]
    fn test_missing_temp_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let namer = ClipNamer::new(dir.path(), dir.path().join("absent"), true);

        assert!(matches!(namer.temp_file("y4m"), Err(SessionError::TempFile { .. })));
    }
}
