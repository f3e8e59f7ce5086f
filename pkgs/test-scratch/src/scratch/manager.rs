use crate::config::{DeletePolicy, ScratchConfig};
use crate::error::{CleanupError, ScratchError};
use crate::scratch::fs::{OsFs, ScratchFs};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

const FILE_SUFFIX: &str = ".tmp";

/// Scratch space of a single test case.
///
/// Entries are created lazily under `root` and remembered until they are
/// deleted, either explicitly through [`TempResourceManager::delete_resource`]
/// or by the sweep in [`TempResourceManager::on_test_finished`].
///
/// Containment is a textual prefix check on the unresolved paths: anything
/// whose string form starts with the string form of `root` counts as managed.
/// Paths such as `<root>/../elsewhere` or `<root>-sibling` pass that check, so
/// callers must not hand untrusted paths to `delete_resource`.
#[derive(Debug)]
pub struct TempResourceManager<F: ScratchFs = OsFs> {
    test_name: String,
    prefix: String,
    root: PathBuf,
    delete_policy: DeletePolicy,
    tracked: HashSet<PathBuf>,
    fs: F,
}

impl TempResourceManager<OsFs> {
    pub fn new(
        test_name: impl Into<String>,
        root: impl Into<PathBuf>,
        delete_policy: DeletePolicy,
    ) -> Self {
        Self::with_fs(test_name, root, delete_policy, OsFs)
    }

    pub fn from_config(test_name: impl Into<String>, config: &ScratchConfig) -> Self {
        Self::new(test_name, config.root.clone(), config.delete_policy)
    }
}

impl<F: ScratchFs> TempResourceManager<F> {
    pub fn with_fs(
        test_name: impl Into<String>,
        root: impl Into<PathBuf>,
        delete_policy: DeletePolicy,
        fs: F,
    ) -> Self {
        let test_name = test_name.into();
        let prefix = format!("{}-", sanitize_name(&test_name));
        Self {
            test_name,
            prefix,
            root: root.into(),
            delete_policy,
            tracked: HashSet::new(),
            fs,
        }
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    /// Overrides the configured policy for this test only.
    pub fn set_delete_policy(&mut self, delete_policy: DeletePolicy) {
        self.delete_policy = delete_policy;
    }

    /// Whether `path` passes the textual containment check.
    pub fn is_managed(&self, path: &Path) -> bool {
        path.as_os_str()
            .as_encoded_bytes()
            .starts_with(self.root.as_os_str().as_encoded_bytes())
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.tracked.contains(path)
    }

    /// Entries still awaiting cleanup, sorted.
    pub fn tracked(&self) -> Vec<&Path> {
        let mut paths: Vec<&Path> = self.tracked.iter().map(PathBuf::as_path).collect();
        paths.sort();
        paths
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    pub fn create_temp_dir(&mut self) -> Result<PathBuf, ScratchError> {
        self.ensure_root()?;
        let dir = self
            .fs
            .create_unique_dir(&self.root, &self.prefix)
            .map_err(|source| {
                ScratchError::io("creating scratch directory in", &self.root, source)
            })?;
        debug!("created scratch directory {}", dir.display());
        self.tracked.insert(dir.clone());
        Ok(dir)
    }

    pub fn create_temp_file(&mut self) -> Result<PathBuf, ScratchError> {
        self.ensure_root()?;
        let file = self
            .fs
            .create_unique_file(&self.root, &self.prefix, FILE_SUFFIX)
            .map_err(|source| {
                ScratchError::io("creating scratch file in", &self.root, source)
            })?;
        debug!("created scratch file {}", file.display());
        self.tracked.insert(file.clone());
        Ok(file)
    }

    /// Deletes `path` and, for directories, everything below it.
    ///
    /// Fails with [`ScratchError::NotManagedPath`] without touching anything
    /// if `path` is not under the scratch root. A path that is already gone
    /// is not an error.
    pub fn delete_resource(&mut self, path: &Path) -> Result<(), ScratchError> {
        if !self.is_managed(path) {
            return Err(ScratchError::NotManagedPath(path.to_path_buf()));
        }

        if self.fs.exists(path) {
            if self.fs.is_dir(path) {
                let children = self
                    .fs
                    .list_dir(path)
                    .map_err(|source| ScratchError::io("listing", path, source))?;
                for child in children {
                    self.delete_resource(&child)?;
                }
                ignore_missing(self.fs.remove_dir(path))
                    .map_err(|source| ScratchError::io("removing directory", path, source))?;
            } else {
                ignore_missing(self.fs.remove_file(path))
                    .map_err(|source| ScratchError::io("removing file", path, source))?;
            }
            debug!("deleted {}", path.display());
        }

        self.tracked.remove(path);
        Ok(())
    }

    /// Applies the delete policy to everything still tracked.
    ///
    /// Every entry is attempted even if some fail; the failures are returned
    /// together and the failed entries stay tracked.
    pub fn on_test_finished(&mut self, test_failed: bool) -> Result<(), CleanupError> {
        if !self.delete_policy.should_delete(test_failed) {
            if !self.tracked.is_empty() {
                info!(
                    "keeping {} scratch entries of {} test {} under {} (delete policy: {})",
                    self.tracked.len(),
                    if test_failed { "failed" } else { "passed" },
                    self.test_name,
                    self.root.display(),
                    self.delete_policy
                );
            }
            return Ok(());
        }

        let mut snapshot: Vec<PathBuf> = self.tracked.iter().cloned().collect();
        snapshot.sort();
        let attempted = snapshot.len();

        let mut failures = Vec::new();
        for path in snapshot {
            if let Err(err) = self.delete_resource(&path) {
                warn!("{}", err);
                failures.push(err);
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CleanupError {
                test_name: self.test_name.clone(),
                attempted,
                failures,
            })
        }
    }

    fn ensure_root(&self) -> Result<(), ScratchError> {
        if self.fs.exists(&self.root) {
            return Ok(());
        }
        self.fs
            .create_dir_all(&self.root)
            .map_err(|source| ScratchError::io("creating scratch root", &self.root, source))?;
        debug!("created scratch root {}", self.root.display());
        Ok(())
    }
}

fn ignore_missing(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Turns a test identifier into something usable as a file name prefix.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
