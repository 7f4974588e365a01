//! URL inspection handler.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use tracing::debug;

use vgrab_models::{normalize, NormalizedResult, Platform};

/// Reason for a body without a string `url`.
pub const REASON_MISSING_URL: &str = "Missing or invalid 'url' field";

/// Reason for a body that is not JSON.
pub const REASON_INVALID_BODY: &str = "Invalid request body";

fn rejected(reason: &str) -> Response {
    let body = NormalizedResult {
        platform: Platform::Unknown,
        normalized_url: String::new(),
        is_valid: false,
        reason: Some(reason.to_string()),
        id: None,
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// Classify and canonicalize a URL.
///
/// Malformed requests still answer with a `NormalizedResult` so clients
/// parse a single shape.
pub async fn inspect(payload: Result<Json<Value>, JsonRejection>) -> Response {
    let Ok(Json(body)) = payload else {
        return rejected(REASON_INVALID_BODY);
    };

    match body.get("url").and_then(Value::as_str) {
        Some(url) if !url.is_empty() => {
            let result = normalize(url);
            debug!(platform = %result.platform, valid = result.is_valid, "Inspected URL");
            Json(result).into_response()
        }
        _ => rejected(REASON_MISSING_URL),
    }
}
