use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Filesystem services the manager calls into.
///
/// Queries never follow symlinks: a link inside a scratch directory is
/// removed as an entry of its own, its target is left alone.
pub trait ScratchFs {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    /// Creates a new directory with a unique name starting with `prefix` directly under `parent`.
    fn create_unique_dir(&self, parent: &Path, prefix: &str) -> io::Result<PathBuf>;
    /// Creates a new empty file named `<prefix><unique><suffix>` directly under `parent`.
    fn create_unique_file(&self, parent: &Path, prefix: &str, suffix: &str)
    -> io::Result<PathBuf>;
    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn remove_dir(&self, path: &Path) -> io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFs;

impl ScratchFs for OsFs {
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn create_unique_dir(&self, parent: &Path, prefix: &str) -> io::Result<PathBuf> {
        // keep() hands the lifetime of the directory over to the caller
        let dir = tempfile::Builder::new().prefix(prefix).tempdir_in(parent)?;
        Ok(under_parent(parent, dir.keep()))
    }

    fn create_unique_file(
        &self,
        parent: &Path,
        prefix: &str,
        suffix: &str,
    ) -> io::Result<PathBuf> {
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(parent)?;
        let kept = file.into_temp_path().keep().map_err(io::Error::from)?;
        Ok(under_parent(parent, kept))
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }
}

// tempfile joins a relative parent onto the working directory; callers
// compare the result textually against `parent`, so rebuild it from there.
fn under_parent(parent: &Path, created: PathBuf) -> PathBuf {
    match created.file_name() {
        Some(name) => parent.join(name),
        None => created,
    }
}
