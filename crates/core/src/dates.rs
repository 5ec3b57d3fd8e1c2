//! Date rules and lenient date parsing.
//!
//! "Today" is evaluated in UTC: a due date is acceptable when it falls on or
//! after midnight UTC of the current day.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Midnight UTC of the day containing `now`.
pub fn start_of_day(now: Timestamp) -> Timestamp {
    Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN))
}

/// Reject task due dates earlier than the start of the current day.
pub fn validate_task_due_date(due_date: Timestamp, now: Timestamp) -> Result<(), CoreError> {
    if due_date < start_of_day(now) {
        return Err(CoreError::invalid_field(
            "dueDate",
            "Due date cannot be in the past",
        ));
    }
    Ok(())
}

/// A project due date, when present, must be strictly after its start date.
pub fn validate_project_dates(
    start_date: Timestamp,
    due_date: Option<Timestamp>,
) -> Result<(), CoreError> {
    match due_date {
        Some(due) if due <= start_date => Err(CoreError::invalid_field(
            "dueDate",
            "Due date must be after start date",
        )),
        _ => Ok(()),
    }
}

/// `true` when the task is past due and not finished.
pub fn is_overdue(due_date: Timestamp, done: bool, now: Timestamp) -> bool {
    !done && due_date < now
}

/// Parse either an RFC 3339 timestamp or a plain `YYYY-MM-DD` date.
///
/// Plain dates resolve to midnight UTC, which is what HTML date inputs send.
pub fn parse_timestamp(value: &str) -> Result<Timestamp, String> {
    let value = value.trim();
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)))
        .map_err(|_| format!("'{value}' is not a valid date (expected YYYY-MM-DD or RFC 3339)"))
}

/// Serde helper for required date fields: `#[serde(deserialize_with = "...")]`.
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

/// Serde helper for optional date fields. Pair with `#[serde(default)]`.
pub fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Serde helper for optional date fields that a client may clear. Pair
/// with `#[serde(default)]`: a missing field is `None`, while `null` or a
/// blank string is `Some(None)`.
pub fn deserialize_clearable_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<Option<Timestamp>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_optional_timestamp(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Duration;

    use super::*;

    fn noon() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 30, 0).unwrap()
    }

    #[test]
    fn start_of_day_truncates_to_midnight() {
        assert_eq!(
            start_of_day(noon()),
            Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn due_today_is_accepted_even_if_hour_passed() {
        let today_midnight = start_of_day(noon());
        assert!(validate_task_due_date(today_midnight, noon()).is_ok());
        assert!(validate_task_due_date(noon() - Duration::hours(3), noon()).is_ok());
    }

    #[test]
    fn due_yesterday_is_rejected() {
        let yesterday = start_of_day(noon()) - Duration::seconds(1);
        assert_matches!(
            validate_task_due_date(yesterday, noon()),
            Err(CoreError::InvalidField { field: "dueDate", .. })
        );
    }

    #[test]
    fn project_due_must_follow_start() {
        let start = noon();
        assert!(validate_project_dates(start, None).is_ok());
        assert!(validate_project_dates(start, Some(start + Duration::days(1))).is_ok());
        assert!(validate_project_dates(start, Some(start)).is_err());
        assert!(validate_project_dates(start, Some(start - Duration::days(1))).is_err());
    }

    #[test]
    fn overdue_requires_unfinished_and_past() {
        let past = noon() - Duration::hours(1);
        assert!(is_overdue(past, false, noon()));
        assert!(!is_overdue(past, true, noon()));
        assert!(!is_overdue(noon() + Duration::hours(1), false, noon()));
    }

    #[test]
    fn parses_plain_dates_and_rfc3339() {
        assert_eq!(
            parse_timestamp("2026-10-16").unwrap(),
            Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_timestamp("2026-10-16T14:00:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
        );
        assert!(parse_timestamp("16/10/2026").is_err());
    }

    #[derive(Debug, Deserialize)]
    struct Form {
        #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
        due: Option<Timestamp>,
    }

    #[test]
    fn optional_helper_accepts_missing_null_and_blank() {
        let missing: Form = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.due, None);
        let null: Form = serde_json::from_str(r#"{"due": null}"#).unwrap();
        assert_eq!(null.due, None);
        let blank: Form = serde_json::from_str(r#"{"due": ""}"#).unwrap();
        assert_eq!(blank.due, None);
        let set: Form = serde_json::from_str(r#"{"due": "2026-12-01"}"#).unwrap();
        assert!(set.due.is_some());
        assert!(serde_json::from_str::<Form>(r#"{"due": "soon"}"#).is_err());
    }

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "deserialize_clearable_timestamp")]
        due: Option<Option<Timestamp>>,
    }

    #[test]
    fn clearable_helper_distinguishes_missing_from_null() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.due, None);
        let null: Patch = serde_json::from_str(r#"{"due": null}"#).unwrap();
        assert_eq!(null.due, Some(None));
        let blank: Patch = serde_json::from_str(r#"{"due": " "}"#).unwrap();
        assert_eq!(blank.due, Some(None));
        let set: Patch = serde_json::from_str(r#"{"due": "2026-12-01"}"#).unwrap();
        assert!(matches!(set.due, Some(Some(_))));
    }
}
