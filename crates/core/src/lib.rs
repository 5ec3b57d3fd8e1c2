//! Domain layer for the taskboard service.
//!
//! Everything in this crate is free of I/O: enums and their wire strings,
//! the error taxonomy, the access policy, status/progress derivation, date
//! rules, listing contracts and statistics folding. The `db` and `api`
//! crates build on these types.

pub mod access;
pub mod dates;
pub mod derivation;
pub mod error;
pub mod listing;
pub mod roles;
pub mod stats;
pub mod status;
pub mod types;
pub mod validation;
