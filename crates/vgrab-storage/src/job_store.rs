//! In-memory job table.
//!
//! Jobs live for the lifetime of the process unless pruned by
//! [`JobStore::prune_terminal`]. Each job is only ever written by the
//! supervisor task that owns it, so map-level locking is sufficient.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use vgrab_models::{Job, JobAction, JobId, JobUpdate};

/// Concurrency-safe job table. Cheap to clone.
#[derive(Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<JobId, Job>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock still guards a consistent map: every mutation below
    // is a single insert, remove or in-place merge.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, Job>> {
        self.jobs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, Job>> {
        self.jobs.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Create a queued job with progress 0.
    pub fn create(&self, url: impl Into<String>, action: JobAction) -> Job {
        let job = Job::new(url, action);
        debug!(job_id = %job.job_id, action = %action, "Created job");
        self.write().insert(job.job_id.clone(), job.clone());
        job
    }

    /// Snapshot of a job.
    pub fn get(&self, job_id: &JobId) -> Option<Job> {
        self.read().get(job_id).cloned()
    }

    /// Merge `update` into a job and return the resulting record.
    ///
    /// Updates that would leave a terminal state or skip the lifecycle are
    /// dropped with a warning; the unchanged job is returned.
    pub fn update(&self, job_id: &JobId, update: JobUpdate) -> Option<Job> {
        let mut jobs = self.write();
        let job = jobs.get_mut(job_id)?;

        if let Err(e) = job.apply(update) {
            warn!(job_id = %job_id, error = %e, "Rejected job update");
        }

        Some(job.clone())
    }

    /// Remove terminal jobs whose last update is older than `ttl`.
    ///
    /// Returns the number of pruned jobs.
    pub fn prune_terminal(&self, ttl: Duration) -> usize {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let Some(cutoff) = Utc::now().checked_sub_signed(ttl) else {
            return 0;
        };

        let mut jobs = self.write();
        let before = jobs.len();
        jobs.retain(|_, job| !(job.status.is_terminal() && job.updated_at < cutoff));
        before - jobs.len()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
