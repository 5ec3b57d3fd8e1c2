//! Account-level roles.
//!
//! These must match the `CHECK` constraint on `users.role` in
//! `20261016000001_create_users_table.sql`. Roles are carried in JWT claims
//! but do not grant any project or task rights; those come from ownership and
//! team membership only.

use crate::status::define_string_enum;

define_string_enum! {
    /// Role assigned to a user account. Signup always yields `user`.
    UserRole ("user role", default = User) {
        User => "user",
        Admin => "admin",
        Manager => "manager",
    }
}
