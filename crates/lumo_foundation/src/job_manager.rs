//! A fixed-size pool of worker threads sharing one job queue.

use std::sync::Arc;

use bitflags::bitflags;

use crate::{AbortSwitch, Error, JobQueue, Result, WorkerThread};

bitflags! {
    /// Behavior switches for a [`JobManager`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct JobManagerFlags: u32 {
        /// Workers keep polling an empty queue instead of exiting.
        const KEEP_RUNNING_ON_EMPTY_QUEUE = 1 << 0;
    }
}

/// Owns N [`WorkerThread`]s and starts/stops them together.
///
/// All workers share the manager's [`JobQueue`] and [`AbortSwitch`]; the
/// switch is also handed to jobs that want to poll for cancellation.
pub struct JobManager {
    job_queue: Arc<JobQueue>,
    abort_switch: AbortSwitch,
    workers: Vec<WorkerThread>,
}

impl JobManager {
    pub fn new(job_queue: Arc<JobQueue>, thread_count: usize, flags: JobManagerFlags) -> Result<Self> {
        Self::with_abort_switch(job_queue, thread_count, flags, AbortSwitch::new())
    }

    /// Create a manager whose workers share an existing abort switch.
    pub fn with_abort_switch(
        job_queue: Arc<JobQueue>,
        thread_count: usize,
        flags: JobManagerFlags,
        abort_switch: AbortSwitch,
    ) -> Result<Self> {
        if thread_count == 0 {
            return Err(Error::InvalidThreadCount);
        }

        let keep_running = flags.contains(JobManagerFlags::KEEP_RUNNING_ON_EMPTY_QUEUE);
        let workers = (0..thread_count)
            .map(|index| {
                WorkerThread::new(index, Arc::clone(&job_queue), abort_switch.clone(), keep_running)
            })
            .collect();

        Ok(Self {
            job_queue,
            abort_switch,
            workers,
        })
    }

    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    pub fn abort_switch(&self) -> &AbortSwitch {
        &self.abort_switch
    }

    pub fn workers(&self) -> &[WorkerThread] {
        &self.workers
    }

    /// Start every worker. If one fails to spawn, the ones already started
    /// are stopped again before the error is returned.
    pub fn start(&mut self) -> Result<()> {
        for index in 0..self.workers.len() {
            if let Err(error) = self.workers[index].start() {
                self.stop();
                return Err(error);
            }
        }
        log::debug!("job manager: started {} worker threads", self.workers.len());
        Ok(())
    }

    /// Raise the abort switch, then join every worker.
    pub fn stop(&mut self) {
        if self.workers.iter().all(|worker| !worker.is_running()) {
            return;
        }

        self.abort_switch.abort();
        for worker in &mut self.workers {
            worker.stop();
        }
        log::debug!("job manager: stopped");
    }

    /// Block until the queue has no scheduled or running jobs.
    pub fn wait_until_completion(&self) {
        self.job_queue.wait_until_completion();
    }

    /// Block until the queue drains or the abort switch is raised. Returns
    /// `true` if the queue drained.
    pub fn wait_until_completion_or_abort(&self) -> bool {
        self.job_queue.wait_until_completion_or_abort(&self.abort_switch)
    }

    /// Sum of (completed, failed) jobs over all workers.
    pub fn job_totals(&self) -> (usize, usize) {
        self.workers.iter().fold((0, 0), |(completed, failed), worker| {
            (completed + worker.stats().completed(), failed + worker.stats().failed())
        })
    }
}

impl Drop for JobManager {
    fn drop(&mut self) {
        self.stop();
    }
}
