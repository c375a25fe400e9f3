//! Facade-level validation: task id charset, payload non-emptiness, and
//! the due/repeats exclusivity rule for `schedule()`.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// `a`-`z`, `0`-`9`, `.`, `-`, `_`. Case-sensitive, matched as stored.
pub fn validate_task_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::Validation("task id must not be empty".to_string()));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_'))
    {
        return Err(Error::Validation(format!(
            "task id '{}' contains characters outside a-z, 0-9, '.', '-', '_'",
            id
        )));
    }
    Ok(())
}

pub fn validate_payload(payload: &str) -> Result<()> {
    if payload.is_empty() {
        return Err(Error::Validation("payload must not be empty".to_string()));
    }
    Ok(())
}

/// `schedule()` requires exactly one of `due` / `repeats`.
pub fn validate_schedule_request(
    due: Option<DateTime<Utc>>,
    repeats: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    match (due, repeats) {
        (Some(_), Some(_)) => Err(Error::Validation(
            "schedule requires exactly one of due or repeats, not both".to_string(),
        )),
        (None, None) => Err(Error::Validation(
            "schedule requires exactly one of due or repeats".to_string(),
        )),
        (Some(due), None) => {
            if due <= now {
                return Err(Error::Validation(format!(
                    "due '{}' must be strictly in the future",
                    due
                )));
            }
            Ok(())
        }
        (None, Some(_)) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn accepts_lowercase_digits_and_allowed_punctuation() {
        assert!(validate_task_id("daily-report_v2.final").is_ok());
    }

    #[test]
    fn rejects_uppercase_and_unknown_punctuation() {
        assert!(validate_task_id("Daily-Report").is_err());
        assert!(validate_task_id("task/1").is_err());
        assert!(validate_task_id("").is_err());
    }

    #[test]
    fn rejects_empty_payload() {
        assert!(validate_payload("").is_err());
        assert!(validate_payload("echo hi").is_ok());
    }

    #[test]
    fn due_equal_to_now_is_rejected() {
        let now = Utc::now();
        assert!(validate_schedule_request(Some(now), None, now).is_err());
    }

    #[test]
    fn due_in_future_is_accepted() {
        let now = Utc::now();
        assert!(validate_schedule_request(Some(now + Duration::seconds(1)), None, now).is_ok());
    }

    #[test]
    fn both_due_and_repeats_is_rejected() {
        let now = Utc::now();
        assert!(validate_schedule_request(Some(now + Duration::seconds(1)), Some("1.seconds"), now).is_err());
    }

    #[test]
    fn neither_due_nor_repeats_is_rejected() {
        let now = Utc::now();
        assert!(validate_schedule_request(None, None, now).is_err());
    }
}
