//! Artifact download handler.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Query parameters for the download endpoint.
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    #[serde(default, rename = "fileId")]
    pub file_id: Option<String>,
}

/// `attachment` disposition with characters that would break the quoted
/// filename removed.
fn content_disposition(filename: &str) -> ApiResult<HeaderValue> {
    let safe: String = filename
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
        .collect();
    HeaderValue::from_bytes(format!("attachment; filename=\"{}\"", safe).as_bytes())
        .map_err(|e| ApiError::internal(format!("invalid content disposition: {}", e)))
}

/// Stream a registered file to the caller.
pub async fn download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<Response> {
    let file_id = query
        .file_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing fileId"))?;

    let registry = state.orchestrator.registry();
    let meta = registry
        .lookup(&file_id)
        .await
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    let path = registry.resolve_path(&meta.filename)?;
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(file_id = %file_id, path = %path.display(), "Registered file vanished");
            return Err(ApiError::not_found("File not found"));
        }
        Err(e) => return Err(ApiError::internal(format!("failed to open file: {}", e))),
    };

    // The bytes on disk are authoritative for the length header.
    let size = file
        .metadata()
        .await
        .map(|m| m.len())
        .unwrap_or(meta.size);

    let content_type = if meta.content_type.is_empty() {
        FALLBACK_CONTENT_TYPE
    } else {
        meta.content_type.as_str()
    };

    info!(file_id = %file_id, size = size, "Serving file");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, size)
        .header(header::CONTENT_DISPOSITION, content_disposition(&meta.filename)?)
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| ApiError::internal(format!("failed to build response: {}", e)))
}
