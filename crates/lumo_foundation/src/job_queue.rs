//! Shared queue of scheduled and running jobs.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::{AbortSwitch, Job};

/// Identifier assigned to a job when it is scheduled.
pub type JobId = u64;

/// Queue-side metadata about a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobInfo {
    pub id: JobId,
}

/// A job claimed from the queue by a worker.
///
/// The job itself moves with this value, so a job can only ever be held by
/// one worker at a time; retiring consumes it.
pub struct RunningJobInfo {
    info: JobInfo,
    job: Box<dyn Job>,
}

impl RunningJobInfo {
    pub fn info(&self) -> JobInfo {
        self.info
    }

    pub fn id(&self) -> JobId {
        self.info.id
    }

    pub fn job_mut(&mut self) -> &mut dyn Job {
        self.job.as_mut()
    }
}

impl fmt::Debug for RunningJobInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningJobInfo")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct QueueState {
    next_id: JobId,
    scheduled: VecDeque<(JobInfo, Box<dyn Job>)>,
    running: HashSet<JobId>,
}

impl QueueState {
    fn is_idle(&self) -> bool {
        self.scheduled.is_empty() && self.running.is_empty()
    }
}

/// Thread-safe FIFO of pending jobs plus the set of running ones.
///
/// Workers claim jobs with [`acquire_scheduled_job`] and hand them back with
/// [`retire_running_job`] once executed, successfully or not.
///
/// [`acquire_scheduled_job`]: JobQueue::acquire_scheduled_job
/// [`retire_running_job`]: JobQueue::retire_running_job
#[derive(Default)]
pub struct JobQueue {
    state: Mutex<QueueState>,
    idle: Condvar,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job to the queue and return its id.
    pub fn schedule(&self, job: Box<dyn Job>) -> JobId {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.scheduled.push_back((JobInfo { id }, job));
        id
    }

    /// Drop every job that has not been claimed yet. Returns how many were
    /// removed. Running jobs are unaffected.
    pub fn clear_scheduled_jobs(&self) -> usize {
        let removed = {
            let mut state = self.state.lock();
            let removed: Vec<_> = state.scheduled.drain(..).collect();
            if state.running.is_empty() {
                self.idle.notify_all();
            }
            removed
        };
        // Jobs are dropped outside the lock.
        removed.len()
    }

    /// Claim the oldest scheduled job.
    ///
    /// Returns `None` when nothing is scheduled; this is the normal "queue
    /// empty" signal, not an error.
    pub fn acquire_scheduled_job(&self) -> Option<RunningJobInfo> {
        let mut state = self.state.lock();
        let (info, job) = state.scheduled.pop_front()?;
        state.running.insert(info.id);
        Some(RunningJobInfo { info, job })
    }

    /// Remove a claimed job from the running set and release it.
    ///
    /// The job is dropped after the queue has been updated, so a panicking
    /// destructor cannot leave it counted as running.
    pub fn retire_running_job(&self, running_job: RunningJobInfo) {
        let RunningJobInfo { info, job } = running_job;

        {
            let mut state = self.state.lock();
            let removed = state.running.remove(&info.id);
            debug_assert!(removed, "job {} retired without being running", info.id);
            if state.is_idle() {
                self.idle.notify_all();
            }
        }

        drop(job);
    }

    pub fn has_scheduled_or_running_jobs(&self) -> bool {
        !self.state.lock().is_idle()
    }

    pub fn scheduled_job_count(&self) -> usize {
        self.state.lock().scheduled.len()
    }

    pub fn running_job_count(&self) -> usize {
        self.state.lock().running.len()
    }

    pub fn total_job_count(&self) -> usize {
        let state = self.state.lock();
        state.scheduled.len() + state.running.len()
    }

    /// Block until no job is scheduled or running.
    pub fn wait_until_completion(&self) {
        let mut state = self.state.lock();
        while !state.is_idle() {
            self.idle.wait(&mut state);
        }
    }

    /// Like [`wait_until_completion`], but also returns once `abort_switch`
    /// is raised. Returns `true` if the queue drained.
    ///
    /// [`wait_until_completion`]: JobQueue::wait_until_completion
    pub fn wait_until_completion_or_abort(&self, abort_switch: &AbortSwitch) -> bool {
        const POLL_INTERVAL: Duration = Duration::from_millis(10);

        let mut state = self.state.lock();
        while !state.is_idle() {
            if abort_switch.is_aborted() {
                return false;
            }
            self.idle.wait_for(&mut state, POLL_INTERVAL);
        }
        true
    }
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("JobQueue")
            .field("scheduled", &state.scheduled.len())
            .field("running", &state.running.len())
            .finish()
    }
}
