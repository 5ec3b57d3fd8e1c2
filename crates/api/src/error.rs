use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Map, Value};
use taskboard_core::error::CoreError;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce the uniform error envelope:
///
/// ```json
/// { "success": false, "message": "...", "code": "...", "errors": { "field": "..." } }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `taskboard_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Request body failed schema validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Malformed JSON body, query string or path parameter.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No route matched the request path.
    #[error("Route not found")]
    RouteNotFound,

    /// A bodiless error status produced outside the handlers, such as a
    /// method mismatch or a request timeout.
    #[error("HTTP {0}")]
    Http(StatusCode),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

/// Debug rendering of the error that produced a response.
///
/// Attached as a response extension so the development-only middleware can
/// surface it as `stack` without handlers knowing the environment.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

/// Parts of an error envelope before serialization.
struct ErrorBody {
    status: StatusCode,
    code: String,
    message: String,
    errors: Option<Map<String, Value>>,
}

impl ErrorBody {
    fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            errors: None,
        }
    }

    fn with_errors(mut self, errors: Map<String, Value>) -> Self {
        self.errors = Some(errors);
        self
    }

    fn server_error() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "SERVER_ERROR",
            "Internal server error",
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, .. } => ErrorBody::new(
                    StatusCode::NOT_FOUND,
                    not_found_code(entity),
                    format!("{entity} not found"),
                ),
                CoreError::Validation(msg) => {
                    ErrorBody::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::InvalidField { field, message } => {
                    let mut errors = Map::new();
                    errors.insert((*field).to_string(), Value::String(message.clone()));
                    ErrorBody::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message.clone())
                        .with_errors(errors)
                }
                CoreError::Duplicate { field, message } => ErrorBody::new(
                    StatusCode::BAD_REQUEST,
                    format!("{}_EXISTS", field.to_ascii_uppercase()),
                    message.clone(),
                ),
                CoreError::Unauthorized(reason) => ErrorBody::new(
                    StatusCode::UNAUTHORIZED,
                    reason.code(),
                    reason.default_message(),
                ),
                CoreError::Forbidden(msg) => {
                    ErrorBody::new(StatusCode::FORBIDDEN, "ACCESS_DENIED", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    ErrorBody::server_error()
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::Validation(errors) => {
                let mut fields = Map::new();
                flatten_validation_errors(errors, "", &mut fields);
                ErrorBody::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", "Validation failed")
                    .with_errors(fields)
            }
            AppError::BadRequest(msg) => {
                ErrorBody::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::RouteNotFound => {
                ErrorBody::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found")
            }
            AppError::Http(status) => status_body(*status),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ErrorBody::server_error()
            }
        };

        let mut response = envelope(body);
        response
            .extensions_mut()
            .insert(ErrorDetail(format!("{self:?}")));
        response
    }
}

fn envelope(body: ErrorBody) -> Response {
    let mut json = json!({
        "success": false,
        "message": body.message,
        "code": body.code,
    });
    if let (Some(errors), Some(obj)) = (body.errors, json.as_object_mut()) {
        obj.insert("errors".to_string(), Value::Object(errors));
    }
    (body.status, axum::Json(json)).into_response()
}

/// The 500 envelope used by the panic handler.
pub fn panic_response() -> Response {
    envelope(ErrorBody::server_error())
}

fn status_body(status: StatusCode) -> ErrorBody {
    match status {
        StatusCode::METHOD_NOT_ALLOWED => {
            ErrorBody::new(status, "METHOD_NOT_ALLOWED", "Method not allowed")
        }
        StatusCode::REQUEST_TIMEOUT => {
            ErrorBody::new(status, "REQUEST_TIMEOUT", "Request timed out")
        }
        s if s.is_server_error() => ErrorBody {
            status: s,
            ..ErrorBody::server_error()
        },
        s => {
            let reason = s.canonical_reason().unwrap_or("Request failed");
            let code = reason.to_ascii_uppercase().replace([' ', '-'], "_");
            ErrorBody::new(s, code, reason)
        }
    }
}

/// `"Team member"` becomes `TEAM_MEMBER_NOT_FOUND`.
fn not_found_code(entity: &str) -> String {
    format!("{}_NOT_FOUND", entity.to_ascii_uppercase().replace(' ', "_"))
}

/// Classify a sqlx error into an error envelope.
///
/// - Unique violations on `uq_` constraints map to 400 `<FIELD>_EXISTS` or
///   `DUPLICATE_VALUE`.
/// - Foreign key and check violations map to 400 `VALIDATION_ERROR`.
/// - Pool exhaustion and I/O failures map to 503 `DATABASE_UNAVAILABLE`.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> ErrorBody {
    match err {
        sqlx::Error::RowNotFound => {
            ErrorBody::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Resource not found")
        }
        sqlx::Error::Database(db_err) => {
            let constraint = db_err.constraint().unwrap_or("unknown");
            match db_err.code().as_deref() {
                // unique_violation
                Some("23505") if constraint.starts_with("uq_") => {
                    if constraint == "uq_users_email" {
                        ErrorBody::new(
                            StatusCode::BAD_REQUEST,
                            "EMAIL_EXISTS",
                            "Email already registered",
                        )
                    } else {
                        ErrorBody::new(
                            StatusCode::BAD_REQUEST,
                            "DUPLICATE_VALUE",
                            format!("Duplicate value violates unique constraint: {constraint}"),
                        )
                    }
                }
                // foreign_key_violation
                Some("23503") => ErrorBody::new(
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    "Referenced record does not exist",
                ),
                // check_violation
                Some("23514") => ErrorBody::new(
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    format!("Value violates constraint: {constraint}"),
                ),
                _ => {
                    tracing::error!(error = %db_err, "Database error");
                    ErrorBody::server_error()
                }
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            tracing::error!(error = %err, "Database unavailable");
            ErrorBody::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "DATABASE_UNAVAILABLE",
                "Database is temporarily unavailable",
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            ErrorBody::server_error()
        }
    }
}

/// Flatten nested `validator` errors into `{ "path.to.field": "message" }`,
/// keeping the first message per field. Paths use the camelCase wire names.
fn flatten_validation_errors(errors: &ValidationErrors, prefix: &str, out: &mut Map<String, Value>) {
    for (field, kind) in errors.errors() {
        let name = to_camel_case(&field.to_string());
        let path = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}.{name}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(first) = list.first() {
                    let message = first
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{path} is invalid ({})", first.code));
                    out.insert(path, Value::String(message));
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten_validation_errors(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten_validation_errors(inner, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}

/// `due_date` becomes `dueDate`; already camelCase names pass through.
fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
