//! Scratch directory for stitched artifacts

use std::path::{Path, PathBuf};

use crate::Result;

/// Working directory recreated on startup and removed on shutdown
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    /// Recreate an empty directory at `path`
    ///
    /// Leftovers from a previous run are removed first; failure to remove
    /// them is only logged.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn prepare(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if path.exists()
            && let Err(e) = std::fs::remove_dir_all(&path)
        {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to remove stale working directory"
            );
        }

        std::fs::create_dir_all(&path)?;
        tracing::debug!(path = %path.display(), "prepared working directory");
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the directory and everything in it
    pub fn remove(self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => tracing::info!(path = %self.path.display(), "removed working directory"),
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove working directory"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_empties_existing_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("work");
        std::fs::create_dir_all(path.join("old")).unwrap();
        std::fs::write(path.join("stale.wav"), b"x").unwrap();

        let work = WorkDir::prepare(&path).unwrap();
        assert_eq!(work.path(), path);
        assert_eq!(std::fs::read_dir(&path).unwrap().count(), 0);
    }

    #[test]
    fn prepare_creates_nested_path() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("a/b/c");

        let work = WorkDir::prepare(&path).unwrap();
        assert!(work.path().is_dir());
    }

    #[test]
    fn prepare_fails_when_blocked_by_file() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        assert!(WorkDir::prepare(blocker.join("work")).is_err());
    }

    #[test]
    fn remove_deletes_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("work");
        let work = WorkDir::prepare(&path).unwrap();
        std::fs::write(path.join("artifact.wav"), b"x").unwrap();

        work.remove();
        assert!(!path.exists());
    }
}
