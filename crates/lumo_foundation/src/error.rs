//! Error types for the foundation crate.

use thiserror::Error;

/// Errors raised while managing worker threads.
///
/// Failures *inside* jobs are not reported here; they are isolated at the
/// worker boundary (see [`crate::JobError`]).
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to spawn worker thread {index}: {source}")]
    ThreadSpawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("a job manager needs at least one worker thread")]
    InvalidThreadCount,
}

pub type Result<T> = std::result::Result<T, Error>;
