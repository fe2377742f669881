//! Lumo Foundation - job scheduling primitives.
//!
//! This crate provides:
//!
//! - **Cancellation**: [`AbortSwitch`], a shared cooperative abort flag
//! - **Jobs**: the [`Job`] trait and the [`JobError`] failure taxonomy
//! - **Scheduling**: [`JobQueue`], drained by [`WorkerThread`]s that a
//!   [`JobManager`] starts and stops together
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lumo_foundation::{FnJob, JobManager, JobManagerFlags, JobQueue};
//!
//! let queue = Arc::new(JobQueue::new());
//! queue.schedule(Box::new(FnJob::new(|worker| {
//!     log::info!("hello from worker {}", worker);
//!     Ok(())
//! })));
//!
//! let mut manager = JobManager::new(queue, 4, JobManagerFlags::empty())?;
//! manager.start()?;
//! manager.wait_until_completion();
//! manager.stop();
//! ```

mod abort_switch;
mod error;
mod job;
mod job_manager;
mod job_queue;
mod worker_thread;

pub use abort_switch::AbortSwitch;
pub use error::{Error, Result};
pub use job::{FnJob, Job, JobError, JobOutcome};
pub use job_manager::{JobManager, JobManagerFlags};
pub use job_queue::{JobId, JobInfo, JobQueue, RunningJobInfo};
pub use worker_thread::{execute_job, WorkerStats, WorkerThread};
