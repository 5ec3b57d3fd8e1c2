//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row (plus joined
//!   display columns where the API needs them)
//! - A `Serialize` response struct with camelCase field names
//! - Plain create/update DTOs consumed by the repositories

pub mod project;
pub mod task;
pub mod user;
