//! The private, temporary directory a render runs in.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::error::CleanupError;

const WORKSPACE_PREFIX: &str = "mapshot";

/// Temporary directory exclusively owned by one run.
///
/// Remove it with [`Workspace::remove`] to learn whether removal worked;
/// dropping it removes it on a best-effort basis.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh directory under the system temp dir.
    pub fn create() -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir()?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Recursively delete the directory.
    pub fn remove(self) -> Result<(), CleanupError> {
        let path: PathBuf = self.dir.path().to_path_buf();
        self.dir
            .close()
            .map_err(|source| CleanupError { path, source })
    }
}
