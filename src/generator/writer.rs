//! File output.
//!
//! Every generated file is written to a temporary file in the destination directory
//! and renamed into place, so a crash never leaves a half-written source file.
//! Content identical to what is on disk is not rewritten.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::marker::{file_marker, Marker};
use crate::error::{GenError, Result};

/// What happened to a destination file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The file did not exist
    Created,
    /// The file existed and its content changed
    Updated,
    /// The file already held exactly this content
    Unchanged,
    /// The file is user-owned and was left alone
    Skipped,
}

impl WriteOutcome {
    /// True when bytes hit the disk
    pub fn wrote(self) -> bool {
        matches!(self, WriteOutcome::Created | WriteOutcome::Updated)
    }
}

fn write_err(path: &Path, source: std::io::Error) -> GenError {
    GenError::Write {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `content` to `path` through a temporary file and rename
///
/// Parent directories are created as needed. Existing permissions are preserved.
///
/// # Errors
///
/// Returns [`GenError::Write`] if any step fails; the destination is untouched in
/// that case.
pub fn write_atomic(path: &Path, content: &str) -> Result<WriteOutcome> {
    let existing = match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(GenError::io(path, e)),
    };
    if existing.as_deref() == Some(content) {
        debug!(path = %path.display(), "Unchanged");
        return Ok(WriteOutcome::Unchanged);
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| write_err(path, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| write_err(path, e))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| write_err(path, e))?;
    tmp.as_file().sync_all().map_err(|e| write_err(path, e))?;

    match fs::metadata(path) {
        Ok(meta) => fs::set_permissions(tmp.path(), meta.permissions())
            .map_err(|e| write_err(path, e))?,
        Err(_) => set_default_permissions(tmp.path()).map_err(|e| write_err(path, e))?,
    }
    tmp.persist(path).map_err(|e| write_err(path, e.error))?;

    let outcome = if existing.is_some() {
        WriteOutcome::Updated
    } else {
        WriteOutcome::Created
    };
    info!(path = %path.display(), ?outcome, "Wrote file");
    Ok(outcome)
}

#[cfg(unix)]
fn set_default_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_default_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Write a user-owned file only when it does not exist yet
pub fn write_if_absent(path: &Path, content: &str) -> Result<WriteOutcome> {
    if path.exists() {
        info!(path = %path.display(), "File exists, skipping");
        return Ok(WriteOutcome::Skipped);
    }
    write_atomic(path, content)
}

/// Overwrite a regenerable file unless the user has taken ownership of it
///
/// A file is regenerable when it is absent or still carries the `DO NOT EDIT` file
/// marker.
pub fn write_regenerable(path: &Path, content: &str) -> Result<WriteOutcome> {
    if path.exists() {
        let current = fs::read_to_string(path).map_err(|e| GenError::io(path, e))?;
        if file_marker(&current) != Some(Marker::DoNotEdit) {
            warn!(
                path = %path.display(),
                "File has no DO NOT EDIT marker; leaving it to its owner"
            );
            return Ok(WriteOutcome::Skipped);
        }
    }
    write_atomic(path, content)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::generator::marker::DO_NOT_EDIT;

    #[test]
    fn creates_updates_and_skips_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("a.rs");

        assert_eq!(write_atomic(&path, "a\n").unwrap(), WriteOutcome::Created);
        assert_eq!(write_atomic(&path, "a\n").unwrap(), WriteOutcome::Unchanged);
        assert_eq!(write_atomic(&path, "b\n").unwrap(), WriteOutcome::Updated);
        assert_eq!(fs::read_to_string(&path).unwrap(), "b\n");

        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn user_owned_files_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let owned = dir.path().join("owned.rs");
        fs::write(&owned, "// mine\n").unwrap();
        assert_eq!(write_if_absent(&owned, "x").unwrap(), WriteOutcome::Skipped);
        assert_eq!(write_regenerable(&owned, "x").unwrap(), WriteOutcome::Skipped);
        assert_eq!(fs::read_to_string(&owned).unwrap(), "// mine\n");

        let generated = dir.path().join("generated.rs");
        fs::write(&generated, format!("{DO_NOT_EDIT}\nold\n")).unwrap();
        let fresh = format!("{DO_NOT_EDIT}\nnew\n");
        assert_eq!(
            write_regenerable(&generated, &fresh).unwrap(),
            WriteOutcome::Updated
        );
    }
}
