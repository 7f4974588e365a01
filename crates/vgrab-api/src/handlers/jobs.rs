//! Job submission and polling handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use vgrab_models::{Job, JobAction, JobId};
use vgrab_worker::URL_REQUIRED;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Job creation request.
#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
}

/// Job creation response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobResponse {
    pub job_id: JobId,
}

/// Start a job. Returns as soon as the job is queued.
pub async fn create_job(
    State(state): State<AppState>,
    payload: Result<Json<CreateJobRequest>, JsonRejection>,
) -> ApiResult<Json<CreateJobResponse>> {
    let Json(request) = payload.map_err(|_| ApiError::bad_request("Invalid request body"))?;

    let url = request.url.unwrap_or_default();
    if url.trim().is_empty() {
        return Err(ApiError::bad_request(URL_REQUIRED));
    }

    let action_name = request
        .action
        .filter(|a| !a.is_empty())
        .ok_or_else(|| ApiError::bad_request("Action is required"))?;
    let action = JobAction::parse(&action_name)
        .ok_or_else(|| ApiError::bad_request(format!("Unsupported action: {}", action_name)))?;

    let job = state.orchestrator.submit(&url, action)?;
    info!(job_id = %job.job_id, action = %action, "Created job");

    Ok(Json(CreateJobResponse { job_id: job.job_id }))
}

/// Current snapshot of a job.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Job>> {
    state
        .orchestrator
        .get(&JobId::from_string(job_id))
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Job not found"))
}
