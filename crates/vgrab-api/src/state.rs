//! Application state.

use vgrab_worker::{JobOrchestrator, WorkerConfig};

use crate::config::ApiConfig;
use crate::error::ApiResult;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: JobOrchestrator,
}

impl AppState {
    /// Create new application state, opening the file registry.
    pub async fn new(config: ApiConfig, worker: WorkerConfig) -> ApiResult<Self> {
        let orchestrator = JobOrchestrator::new(worker).await?;
        Ok(Self::with_orchestrator(config, orchestrator))
    }

    pub fn with_orchestrator(config: ApiConfig, orchestrator: JobOrchestrator) -> Self {
        Self { config, orchestrator }
    }
}
