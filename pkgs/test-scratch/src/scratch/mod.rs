pub mod fs;
pub mod guard;
pub mod manager;

pub use fs::{OsFs, ScratchFs};
pub use guard::{TestOutcome, TestScratch, run_scratch_test, run_scratch_test_with};
pub use manager::TempResourceManager;
