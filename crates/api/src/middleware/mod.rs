//! Request extractors and response middleware.
//!
//! - [`auth::AuthUser`] -- Resolves the authenticated, active user from a Bearer token.
//! - [`dev_errors::attach_error_detail`] -- Adds `stack` to error bodies in development.
//! - [`envelope::envelope_bare_errors`] -- Gives bodiless error statuses the envelope.

pub mod auth;
pub mod dev_errors;
pub mod envelope;
