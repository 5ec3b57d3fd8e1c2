//! Success envelope shared by all API handlers.
//!
//! Every success response is `{ "success": true, "message": ..., "data": ... }`,
//! with `count` added for list payloads. Errors use the same shape with
//! `success: false`, see [`crate::error::AppError`].

use serde::Serialize;

/// Standard success envelope.
///
/// # Example
///
/// ```ignore
/// Ok(Json(ApiResponse::ok("Project retrieved successfully", project)))
/// ```
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            count: None,
            data: Some(data),
        }
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    /// A list payload; `count` is the number of items returned.
    pub fn list(message: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            success: true,
            message: message.into(),
            count: Some(items.len()),
            data: Some(items),
        }
    }
}

impl ApiResponse<()> {
    /// A message-only response with no `data` key.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            count: None,
            data: None,
        }
    }
}
