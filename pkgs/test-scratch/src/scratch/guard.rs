use crate::config::ScratchConfig;
use crate::error::CleanupError;
use crate::scratch::fs::{OsFs, ScratchFs};
use crate::scratch::manager::TempResourceManager;
use log::error;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::thread;

/// Owns the manager of one test and delivers the outcome when it goes out of scope.
///
/// The test counts as failed if [`TestScratch::mark_failed`] was called or the
/// guard is dropped while the thread is panicking. Cleanup failures cannot
/// leave `Drop`, so they are reported through the `log` facade; use
/// [`TestScratch::finish`] to receive them instead.
pub struct TestScratch<F: ScratchFs = OsFs> {
    manager: TempResourceManager<F>,
    failed: bool,
    finished: bool,
}

impl TestScratch<OsFs> {
    /// Guard configured from [`ScratchConfig::shared`].
    pub fn new(test_name: impl Into<String>) -> Self {
        Self::with_config(test_name, ScratchConfig::shared())
    }

    pub fn with_config(test_name: impl Into<String>, config: &ScratchConfig) -> Self {
        Self::from_manager(TempResourceManager::from_config(test_name, config))
    }
}

impl<F: ScratchFs> TestScratch<F> {
    pub fn from_manager(manager: TempResourceManager<F>) -> Self {
        Self {
            manager,
            failed: false,
            finished: false,
        }
    }

    /// Records a failure that did not panic, e.g. a soft assertion.
    pub fn mark_failed(&mut self) {
        self.failed = true;
    }

    pub fn is_failed(&self) -> bool {
        self.failed || thread::panicking()
    }

    /// Ends the test now and returns the cleanup outcome.
    pub fn finish(mut self) -> Result<(), CleanupError> {
        self.finished = true;
        let failed = self.is_failed();
        self.manager.on_test_finished(failed)
    }
}

impl<F: ScratchFs> Deref for TestScratch<F> {
    type Target = TempResourceManager<F>;

    fn deref(&self) -> &Self::Target {
        &self.manager
    }
}

impl<F: ScratchFs> DerefMut for TestScratch<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.manager
    }
}

impl<F: ScratchFs> Drop for TestScratch<F> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let failed = self.is_failed();
        if let Err(err) = self.manager.on_test_finished(failed) {
            report_cleanup_failure(&err);
        }
    }
}

/// How a test body tells whether it failed without panicking.
pub trait TestOutcome {
    fn is_failure(&self) -> bool;
}

impl TestOutcome for () {
    fn is_failure(&self) -> bool {
        false
    }
}

impl<T, E> TestOutcome for Result<T, E> {
    fn is_failure(&self) -> bool {
        self.is_err()
    }
}

/// Runs `body` with a fresh manager configured from [`ScratchConfig::shared`].
pub fn run_scratch_test<R, B>(test_name: &str, body: B) -> R
where
    R: TestOutcome,
    B: FnOnce(&mut TempResourceManager) -> R,
{
    run_scratch_test_with(ScratchConfig::shared(), test_name, body)
}

/// Runs `body` and notifies the manager exactly once, whether the body
/// returns, returns a failure, or panics. A panic is resumed after cleanup.
pub fn run_scratch_test_with<R, B>(config: &ScratchConfig, test_name: &str, body: B) -> R
where
    R: TestOutcome,
    B: FnOnce(&mut TempResourceManager) -> R,
{
    let mut manager = TempResourceManager::from_config(test_name, config);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&mut manager)));

    let failed = match &outcome {
        Ok(value) => value.is_failure(),
        Err(_) => true,
    };
    if let Err(err) = manager.on_test_finished(failed) {
        report_cleanup_failure(&err);
    }

    match outcome {
        Ok(value) => value,
        Err(payload) => panic::resume_unwind(payload),
    }
}

fn report_cleanup_failure(err: &CleanupError) {
    error!("{}", err);
    for failure in &err.failures {
        error!("  {}", failure);
    }
}
