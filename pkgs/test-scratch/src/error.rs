use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScratchError {
    /// The filesystem refused an operation on `path`.
    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A delete was requested for a path outside the scratch root.
    #[error("Not a unit test temporary directory: {}", .0.display())]
    NotManagedPath(PathBuf),
}

impl ScratchError {
    pub(crate) fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        ScratchError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    /// The path the failed operation was attempted on.
    pub fn path(&self) -> &Path {
        match self {
            ScratchError::Io { path, .. } => path,
            ScratchError::NotManagedPath(path) => path,
        }
    }
}

/// Failures collected while sweeping the tracked entries of a finished test.
#[derive(Debug, Error)]
#[error(
    "{} of {attempted} scratch entries of test {test_name} could not be removed",
    failures.len()
)]
pub struct CleanupError {
    pub test_name: String,
    pub attempted: usize,
    pub failures: Vec<ScratchError>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown delete policy '{0}', expected one of: always, passed, never")]
pub struct UnknownPolicy(pub String);
