//! Wraps bodiless error responses in the error envelope.
//!
//! Axum's method-not-allowed response and the timeout layer's 408 carry a
//! status but no body. Handler errors already render through [`AppError`].

use axum::body::HttpBody;
use axum::extract::Request;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;

/// Replace an empty 4xx/5xx body with the envelope for its status. Other
/// headers (e.g. `allow` on a 405) are kept.
pub async fn envelope_bare_errors(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error())
        || response.body().size_hint().exact() != Some(0)
    {
        return response;
    }

    let (parts, _) = response.into_parts();
    let mut enveloped = AppError::Http(status).into_response();
    for (name, value) in &parts.headers {
        if name != CONTENT_LENGTH && name != CONTENT_TYPE {
            enveloped.headers_mut().insert(name.clone(), value.clone());
        }
    }
    enveloped
}
