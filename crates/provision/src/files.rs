//! Filesystem helpers shared by the acquisition and build paths.

use std::path::Path;
use tracing::{debug, warn};

/// Set `rwxr-xr-x` on `path`. No-op on platforms without unix permissions.
pub(crate) fn make_executable(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// A file being written at its final location.
///
/// Unless [`PartialFile::commit`] is called, the file is removed when the
/// guard is dropped, so a failed or abandoned write never leaves a
/// half-written binary behind.
#[derive(Debug)]
pub(crate) struct PartialFile<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> PartialFile<'a> {
    pub(crate) const fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    /// Keep the file.
    pub(crate) fn commit(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialFile<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed partial download"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove partial download"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    #[test]
    fn test_make_executable_sets_755() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin");
        std::fs::write(&path, b"x").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();

        make_executable(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_make_executable_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = make_executable(&dir.path().join("missing"));
        if cfg!(unix) {
            assert!(result.is_err());
        }
    }

    #[test]
    fn test_partial_file_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial");
        std::fs::write(&path, b"half").unwrap();

        drop(PartialFile::new(&path));
        assert!(!path.exists());
    }

    #[test]
    fn test_partial_file_kept_on_commit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("complete");
        std::fs::write(&path, b"full").unwrap();

        PartialFile::new(&path).commit();
        assert!(path.exists());
    }

    #[test]
    fn test_partial_file_tolerates_missing_file() {
        let dir = TempDir::new().unwrap();
        drop(PartialFile::new(&dir.path().join("never-created")));
    }
}
