use crate::types::DbId;

/// Reasons an authentication attempt is rejected.
///
/// Each variant maps to a machine-readable `code` in the error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No `Authorization: Bearer` header was sent.
    NoToken,
    /// The token could not be decoded or its signature is wrong.
    InvalidToken,
    /// The token decoded but its `exp` claim is in the past.
    TokenExpired,
    /// The token is valid but its subject no longer resolves to a user.
    AuthFailed,
    /// Email/password combination did not match.
    InvalidCredentials,
    /// The account exists but has been deactivated.
    AccountDeactivated,
}

impl AuthFailure {
    pub fn code(self) -> &'static str {
        match self {
            AuthFailure::NoToken => "NO_TOKEN",
            AuthFailure::InvalidToken => "INVALID_TOKEN",
            AuthFailure::TokenExpired => "TOKEN_EXPIRED",
            AuthFailure::AuthFailed => "AUTH_FAILED",
            AuthFailure::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthFailure::AccountDeactivated => "ACCOUNT_DEACTIVATED",
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            AuthFailure::NoToken => "Access denied. No token provided.",
            AuthFailure::InvalidToken => "Invalid token.",
            AuthFailure::TokenExpired => "Token expired. Please log in again.",
            AuthFailure::AuthFailed => "Authentication failed.",
            AuthFailure::InvalidCredentials => "Invalid email or password",
            AuthFailure::AccountDeactivated => "Account is deactivated. Contact an administrator.",
        }
    }
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// A single request field failed a stateful check (dates, references).
    #[error("Invalid {field}: {message}")]
    InvalidField { field: &'static str, message: String },

    /// A unique value is already taken. `field` becomes the `<FIELD>_EXISTS` code.
    #[error("Duplicate {field}: {message}")]
    Duplicate { field: &'static str, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(AuthFailure),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for an [`AuthFailure`] rejection.
    pub fn unauthorized(reason: AuthFailure) -> Self {
        CoreError::Unauthorized(reason)
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        CoreError::Forbidden(reason.into())
    }

    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        CoreError::InvalidField {
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failure_codes_are_distinct() {
        let all = [
            AuthFailure::NoToken,
            AuthFailure::InvalidToken,
            AuthFailure::TokenExpired,
            AuthFailure::AuthFailed,
            AuthFailure::InvalidCredentials,
            AuthFailure::AccountDeactivated,
        ];
        let mut codes: Vec<_> = all.iter().map(|f| f.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn token_codes_match_wire_contract() {
        assert_eq!(AuthFailure::NoToken.code(), "NO_TOKEN");
        assert_eq!(AuthFailure::InvalidToken.code(), "INVALID_TOKEN");
        assert_eq!(AuthFailure::TokenExpired.code(), "TOKEN_EXPIRED");
        assert_eq!(AuthFailure::AuthFailed.code(), "AUTH_FAILED");
    }

    #[test]
    fn invalid_field_display_names_the_field() {
        let err = CoreError::invalid_field("dueDate", "Due date cannot be in the past");
        assert_eq!(
            err.to_string(),
            "Invalid dueDate: Due date cannot be in the past"
        );
    }
}
