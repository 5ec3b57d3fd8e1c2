//! Development-only enrichment of error responses.

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::CONTENT_LENGTH;
use axum::middleware::Next;
use axum::response::Response;
use serde_json::Value;

use crate::error::ErrorDetail;
use crate::state::AppState;

/// Error envelopes are small; anything larger is passed through untouched.
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

/// Copy the [`ErrorDetail`] of an error response into its JSON body as
/// `stack`. A no-op outside the development environment.
pub async fn attach_error_detail(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    if !state.config.environment.is_development() {
        return response;
    }
    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_ERROR_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Could not buffer error body");
            return Response::from_parts(parts, Body::empty());
        }
    };

    let mut json = match serde_json::from_slice::<Value>(&bytes) {
        Ok(json) => json,
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };
    if let Some(obj) = json.as_object_mut() {
        obj.insert("stack".to_string(), Value::String(detail));
    }

    match serde_json::to_vec(&json) {
        Ok(enriched) => {
            parts.headers.remove(CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(enriched))
        }
        Err(_) => Response::from_parts(parts, Body::from(bytes)),
    }
}
