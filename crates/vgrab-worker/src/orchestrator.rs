//! Job orchestrator.
//!
//! Composition root for the job store, the file registry and the process
//! supervisor. Submission validates input, records a queued job and hands it
//! to its own supervisor task; callers observe progress by polling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use vgrab_models::platform::REASON_INVALID_FORMAT;
use vgrab_models::{normalize, Job, JobAction, JobId};
use vgrab_storage::{FileRegistry, JobStore};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::metrics;
use crate::supervisor::ProcessSupervisor;

/// Rejection message for a missing or blank URL.
pub const URL_REQUIRED: &str = "URL is required";

/// Owns the job lifecycle.
#[derive(Clone)]
pub struct JobOrchestrator {
    config: Arc<WorkerConfig>,
    store: JobStore,
    registry: FileRegistry,
    supervisor: Arc<ProcessSupervisor>,
}

impl JobOrchestrator {
    /// Open the registry in the configured output directory and wire the
    /// supervisor.
    pub async fn new(config: WorkerConfig) -> WorkerResult<Self> {
        let registry = FileRegistry::open(&config.output_dir).await?;
        let store = JobStore::new();
        let supervisor = ProcessSupervisor::from_config(&config, store.clone(), registry.clone());
        Ok(Self::with_parts(config, store, registry, supervisor))
    }

    /// Assemble from pre-built parts.
    pub fn with_parts(
        config: WorkerConfig,
        store: JobStore,
        registry: FileRegistry,
        supervisor: ProcessSupervisor,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            registry,
            supervisor: Arc::new(supervisor),
        }
    }

    /// Create a job and start its supervisor. Returns immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, url: &str, action: JobAction) -> WorkerResult<Job> {
        let url = url.trim();
        if url.is_empty() {
            return Err(WorkerError::invalid_request(URL_REQUIRED));
        }
        if url.starts_with('-') {
            return Err(WorkerError::invalid_request(REASON_INVALID_FORMAT));
        }
        let normalized = normalize(url);
        if !normalized.is_valid {
            let reason = normalized.reason.as_deref().unwrap_or(REASON_INVALID_FORMAT);
            return Err(WorkerError::invalid_request(reason));
        }

        let job = self.store.create(url, action);
        metrics::record_job_submitted(action);
        info!(job_id = %job.job_id, action = %action, "Job submitted");

        let supervisor = Arc::clone(&self.supervisor);
        let job_id = job.job_id.clone();
        tokio::spawn(async move {
            supervisor.run(job_id).await;
        });

        Ok(job)
    }

    /// Snapshot of a job.
    pub fn get(&self, job_id: &JobId) -> Option<Job> {
        self.store.get(job_id)
    }

    pub fn registry(&self) -> &FileRegistry {
        &self.registry
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Start the expiry loop. Returns `None` when the TTL is zero.
    ///
    /// The loop stops when `shutdown` flips to `true` or its sender drops.
    pub fn spawn_reaper(&self, shutdown: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        if self.config.job_ttl.is_zero() {
            info!("Job expiry is disabled");
            return None;
        }

        let reaper = JobReaper {
            store: self.store.clone(),
            ttl: self.config.job_ttl,
            every: self.config.reap_interval.max(Duration::from_secs(1)),
        };
        Some(tokio::spawn(reaper.run(shutdown)))
    }
}

/// Prunes terminal jobs past their TTL.
struct JobReaper {
    store: JobStore,
    ttl: Duration,
    every: Duration,
}

impl JobReaper {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(ttl = ?self.ttl, interval = ?self.every, "Starting job reaper");

        let mut ticker = interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Job reaper stopping");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let pruned = self.store.prune_terminal(self.ttl);
                    let remaining = self.store.len();
                    if pruned > 0 {
                        info!(pruned = pruned, remaining = remaining, "Pruned expired jobs");
                    }
                    metrics::record_jobs_pruned(pruned, remaining);
                }
            }
        }
    }
}
