//! Worker threads draining a shared job queue.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::{AbortSwitch, Error, Job, JobOutcome, JobQueue, Result};

/// Per-worker execution counters.
#[derive(Debug, Default)]
pub struct WorkerStats {
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl WorkerStats {
    /// Jobs that returned `Ok`.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    /// Jobs that returned an error or panicked.
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    fn record(&self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Completed => self.completed.fetch_add(1, Ordering::Relaxed),
            JobOutcome::Failed | JobOutcome::Panicked => self.failed.fetch_add(1, Ordering::Relaxed),
        };
    }
}

/// One OS thread pulling jobs from a [`JobQueue`].
///
/// A worker is either stopped (no thread) or running (one thread). With
/// `keep_running` set, an empty queue makes the thread yield and poll again
/// until stopped; otherwise the thread exits as soon as the queue is empty.
pub struct WorkerThread {
    index: usize,
    job_queue: Arc<JobQueue>,
    abort_switch: AbortSwitch,
    keep_running: bool,
    stats: Arc<WorkerStats>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerThread {
    pub fn new(
        index: usize,
        job_queue: Arc<JobQueue>,
        abort_switch: AbortSwitch,
        keep_running: bool,
    ) -> Self {
        Self {
            index,
            job_queue,
            abort_switch,
            keep_running,
            stats: Arc::new(WorkerStats::default()),
            thread: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// True between a successful [`start`] and the next [`stop`], even if
    /// the loop already exited on its own after draining the queue.
    ///
    /// [`start`]: WorkerThread::start
    /// [`stop`]: WorkerThread::stop
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// True once the thread has left its run loop (or was never started).
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |handle| handle.is_finished())
    }

    /// Spawn the worker's thread. Does nothing if it is already running.
    ///
    /// Clears the abort switch, which is shared with the rest of the pool.
    pub fn start(&mut self) -> Result<()> {
        if self.thread.is_some() {
            return Ok(());
        }

        self.abort_switch.clear();

        let context = WorkerContext {
            index: self.index,
            job_queue: Arc::clone(&self.job_queue),
            abort_switch: self.abort_switch.clone(),
            keep_running: self.keep_running,
            stats: Arc::clone(&self.stats),
        };

        let handle = thread::Builder::new()
            .name(format!("worker-{}", self.index))
            .spawn(move || context.run())
            .map_err(|source| Error::ThreadSpawn {
                index: self.index,
                source,
            })?;

        self.thread = Some(handle);
        log::debug!("worker thread {}: started", self.index);
        Ok(())
    }

    /// Abort and join the worker's thread. Does nothing if it is stopped.
    ///
    /// Blocks until the in-flight job, if any, returns.
    pub fn stop(&mut self) {
        let Some(handle) = self.thread.take() else {
            return;
        };

        self.abort_switch.abort();

        if handle.join().is_err() {
            log::error!("worker thread {}: thread panicked outside of a job", self.index);
        }

        log::debug!(
            "worker thread {}: stopped ({} completed, {} failed)",
            self.index,
            self.stats.completed(),
            self.stats.failed()
        );
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State moved onto the worker's OS thread.
struct WorkerContext {
    index: usize,
    job_queue: Arc<JobQueue>,
    abort_switch: AbortSwitch,
    keep_running: bool,
    stats: Arc<WorkerStats>,
}

impl WorkerContext {
    fn run(&self) {
        while !self.abort_switch.is_aborted() {
            let Some(mut running_job) = self.job_queue.acquire_scheduled_job() else {
                if self.keep_running {
                    thread::yield_now();
                    continue;
                }
                break;
            };

            let outcome = execute_job(self.index, running_job.job_mut());
            self.stats.record(outcome);

            self.job_queue.retire_running_job(running_job);
        }
    }
}

/// Run `job` on behalf of worker `worker_index`, isolating its failures.
///
/// Errors returned by the job and panics raised inside it are logged once,
/// with the worker index, and reported through the returned outcome. They
/// never propagate to the caller, and the job is not retried.
pub fn execute_job(worker_index: usize, job: &mut dyn Job) -> JobOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| job.execute(worker_index))) {
        Ok(Ok(())) => JobOutcome::Completed,
        Ok(Err(error)) => {
            log::error!(
                "worker thread {}: job was terminated ({}).",
                worker_index,
                error
            );
            JobOutcome::Failed
        }
        Err(payload) => {
            match panic_message(payload.as_ref()) {
                Some(message) => log::error!(
                    "worker thread {}: job was terminated (unknown failure: {}).",
                    worker_index,
                    message
                ),
                None => log::error!(
                    "worker thread {}: job was terminated (unknown failure).",
                    worker_index
                ),
            }
            JobOutcome::Panicked
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> Option<&str> {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
}
