//! Filesystem access used while staging.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;

/// The filesystem operations staging needs.
///
/// Staging only talks to the filesystem through this trait so its rules can
/// be exercised against an in-memory tree.
pub trait StagingFs {
    /// Names of the immediate children of a directory.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Copy a file or a directory tree. Symlinks are followed and their
    /// targets copied, so the result never points outside `dst`.
    fn copy_deep(&self, src: &Path, dst: &Path) -> io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl StagingFs for OsFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let mut names = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<io::Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn copy_deep(&self, src: &Path, dst: &Path) -> io::Result<()> {
        // metadata() follows symlinks.
        if fs::metadata(src)?.is_dir() {
            fs::create_dir_all(dst)?;
            for name in self.read_dir(src)? {
                self.copy_deep(&src.join(&name), &dst.join(&name))?;
            }
            Ok(())
        } else {
            fs::copy(src, dst).map(|_| ())
        }
    }
}
