//! Units of schedulable work.

use std::collections::TryReserveError;
use std::fmt;

use thiserror::Error;

/// Ways a job can fail.
///
/// Panics raised while a job runs are the "unknown" failure case; they are
/// caught at the worker boundary and never surface as a `JobError`.
#[derive(Error, Debug)]
pub enum JobError {
    /// A failure carrying both a short description and details.
    #[error("{what}: {detail}")]
    Descriptive { what: String, detail: String },

    #[error("{0}")]
    Generic(String),

    /// An allocation was refused (see `Vec::try_reserve`).
    #[error("ran out of memory")]
    OutOfMemory(#[from] TryReserveError),
}

impl JobError {
    pub fn descriptive(what: impl Into<String>, detail: impl Into<String>) -> Self {
        JobError::Descriptive {
            what: what.into(),
            detail: detail.into(),
        }
    }

    pub fn generic(message: impl Into<String>) -> Self {
        JobError::Generic(message.into())
    }
}

/// A unit of work executed by a worker thread.
///
/// `worker_index` identifies the executing worker, which lets a job pick
/// per-worker resources (tracers, sample generators) without locking.
pub trait Job: Send {
    fn execute(&mut self, worker_index: usize) -> Result<(), JobError>;
}

/// How a job execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    /// The job returned a [`JobError`].
    Failed,
    /// The job panicked.
    Panicked,
}

/// Adapts a closure into a [`Job`].
pub struct FnJob<F> {
    func: F,
}

impl<F> FnJob<F>
where
    F: FnMut(usize) -> Result<(), JobError> + Send,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Job for FnJob<F>
where
    F: FnMut(usize) -> Result<(), JobError> + Send,
{
    fn execute(&mut self, worker_index: usize) -> Result<(), JobError> {
        (self.func)(worker_index)
    }
}

impl<F> fmt::Debug for FnJob<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnJob").finish_non_exhaustive()
    }
}
