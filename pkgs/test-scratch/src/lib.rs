//! Private scratch directories and files for tests.
//!
//! Each test gets a [`TempResourceManager`] that creates uniquely named
//! entries under a scratch root, remembers them, and removes them when the
//! test finishes according to a [`DeletePolicy`]. Deletion refuses paths that
//! do not lie under the root.
//!
//! ```no_run
//! use test_scratch::{TestScratch, test_name};
//!
//! let mut scratch = TestScratch::new(test_name!());
//! let dir = scratch.create_temp_dir().unwrap();
//! std::fs::write(dir.join("out.txt"), "data").unwrap();
//! // dropped here: removed if the test passed, kept for inspection if it panicked
//! ```

pub mod config;
pub mod error;
pub mod logging;
mod macros;
pub mod scratch;

pub use config::{DeletePolicy, ScratchConfig};
pub use error::{CleanupError, ScratchError, UnknownPolicy};
pub use scratch::{
    OsFs, ScratchFs, TempResourceManager, TestOutcome, TestScratch, run_scratch_test,
    run_scratch_test_with,
};
