//! Filesystem collaborator.
//!
//! The resolution core never touches `std::fs` directly; everything goes
//! through this trait so tests can run against temporary directories and
//! so a missing file stays distinguishable from an unreadable one
//! (`io::ErrorKind::NotFound`).

use std::io;
use std::path::{Path, PathBuf};

/// Blocking filesystem operations the core needs.
pub trait Filesystem {
    /// Read a file to a string. A missing file surfaces as
    /// `io::ErrorKind::NotFound`.
    fn read_contents(&self, path: &Path) -> io::Result<String>;

    fn exists(&self, path: &Path) -> bool;

    fn is_directory(&self, path: &Path) -> bool;

    fn create_directories(&self, path: &Path) -> io::Result<()>;

    fn write_contents(&self, path: &Path, contents: &str) -> io::Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Immediate subdirectories of `path`, in name order.
    fn list_directories(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Immediate regular files of `path`, in name order.
    fn list_regular_files(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFilesystem;

impl RealFilesystem {
    fn list_entries(path: &Path, want_dirs: bool) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() == want_dirs {
                entries.push(entry.path());
            }
        }
        entries.sort();
        Ok(entries)
    }
}

impl Filesystem for RealFilesystem {
    fn read_contents(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_directories(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn write_contents(&self, path: &Path, contents: &str) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn list_directories(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        Self::list_entries(path, true)
    }

    fn list_regular_files(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        Self::list_entries(path, false)
    }
}
