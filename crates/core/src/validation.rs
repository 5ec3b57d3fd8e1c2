//! Custom field validators for `#[validate(custom(function = "..."))]`.

use std::borrow::Cow;

use validator::ValidationError;

pub const MAX_TAGS: usize = 20;
pub const MAX_TAG_LEN: usize = 30;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Reject strings that are empty once surrounding whitespace is removed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("blank", "must not be blank"));
    }
    Ok(())
}

/// At most [`MAX_TAGS`] tags, each non-blank and at most [`MAX_TAG_LEN`] chars.
#[allow(clippy::ptr_arg)]
pub fn validate_tags(tags: &Vec<String>) -> Result<(), ValidationError> {
    if tags.len() > MAX_TAGS {
        return Err(error("too_many_tags", "at most 20 tags are allowed"));
    }
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(error("blank_tag", "tags must not be blank"));
        }
        if tag.chars().count() > MAX_TAG_LEN {
            return Err(error("tag_too_long", "tags must be at most 30 characters"));
        }
    }
    Ok(())
}

/// ISO 4217 style: exactly three ASCII uppercase letters.
pub fn validate_currency(code: &str) -> Result<(), ValidationError> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(error(
            "currency",
            "currency must be a three-letter uppercase code",
        ))
    }
}

/// Trim tags and drop duplicates while keeping first-seen order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
