pub mod auth;
pub mod project;
pub mod task;

use std::str::FromStr;

use taskboard_core::error::CoreError;
use taskboard_core::status::{parse_optional, ParseEnumError};
use taskboard_core::types::DbId;
use taskboard_db::models::user::User;
use taskboard_db::repositories::UserRepo;
use taskboard_db::DbPool;

use crate::error::AppResult;

/// Resolve `user_id` to an active account, reporting a failure against
/// `field` of the request body.
pub(crate) async fn require_active_user(
    pool: &DbPool,
    user_id: DbId,
    field: &'static str,
) -> AppResult<User> {
    match UserRepo::find_by_id(pool, user_id).await? {
        Some(user) if user.is_active => Ok(user),
        _ => Err(CoreError::invalid_field(
            field,
            format!("User {user_id} does not exist or is inactive"),
        )
        .into()),
    }
}

/// Parse an enum-valued query parameter. A blank value (`?status=`) means
/// "no filter".
pub(crate) fn query_enum<T>(field: &'static str, raw: Option<&str>) -> AppResult<Option<T>>
where
    T: FromStr<Err = ParseEnumError>,
{
    parse_optional(raw).map_err(|e| CoreError::invalid_field(field, e.to_string()).into())
}

/// Parse an id-valued query parameter, treating a blank value as absent.
pub(crate) fn query_id(field: &'static str, raw: Option<&str>) -> AppResult<Option<DbId>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| CoreError::invalid_field(field, format!("Invalid id '{v}'")).into()),
    }
}
