use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use super::error::{DomainError, Result};

pub(crate) const MAX_TITLE_CHARS: usize = 200;
pub(crate) const MAX_DESCRIPTION_CHARS: usize = 5000;
pub(crate) const MAX_COMMENT_CHARS: usize = 2000;
pub(crate) const PRIORITY_RANGE: std::ops::RangeInclusive<i32> = 1..=10;

pub(crate) fn title(raw: &str, field: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(DomainError::validation(format!(
            "{field} must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trims the description; blank input clears it.
pub(crate) fn description(raw: Option<&str>) -> Result<Option<String>> {
    let Some(trimmed) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    if trimmed.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(DomainError::validation(format!(
            "description must be at most {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

pub(crate) fn priority(value: Option<i32>) -> Result<Option<i32>> {
    match value {
        Some(priority) if !PRIORITY_RANGE.contains(&priority) => Err(DomainError::validation(
            "priority must be between 1 and 10",
        )),
        other => Ok(other),
    }
}

pub(crate) fn time_taken(value: Option<i64>) -> Result<Option<i64>> {
    match value {
        Some(minutes) if minutes < 0 => Err(DomainError::validation(
            "time_taken must not be negative",
        )),
        other => Ok(other),
    }
}

/// Due dates may not lie before today (UTC) when they are set.
pub(crate) fn future_due_date(value: Option<NaiveDate>) -> Result<Option<NaiveDate>> {
    match value {
        Some(date) if date < Utc::now().date_naive() => Err(DomainError::validation(
            "due_date cannot be in the past",
        )),
        other => Ok(other),
    }
}

pub(crate) fn comment_text(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("Comment text is required"));
    }
    if trimmed.chars().count() > MAX_COMMENT_CHARS {
        return Err(DomainError::validation(format!(
            "Comment must be at most {MAX_COMMENT_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// `local@domain.tld` with no whitespace.
pub(crate) fn email(raw: &str) -> Result<String> {
    let candidate = raw.trim().to_lowercase();
    let valid = !candidate.chars().any(char::is_whitespace)
        && candidate.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        });
    if valid {
        Ok(candidate)
    } else {
        Err(DomainError::validation("username must be a valid email address"))
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`). Use with `#[serde(default)]`.
pub(crate) fn nullable<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn titles_are_trimmed_and_bounded() {
        assert_eq!(title("  Ship it ", "title").unwrap(), "Ship it");
        assert!(title("   ", "title").is_err());
        assert!(title(&"x".repeat(MAX_TITLE_CHARS + 1), "title").is_err());
    }

    #[test]
    fn priority_must_be_in_range() {
        assert_eq!(priority(Some(1)).unwrap(), Some(1));
        assert_eq!(priority(None).unwrap(), None);
        assert!(priority(Some(0)).is_err());
        assert!(priority(Some(11)).is_err());
    }

    #[test]
    fn past_due_dates_are_rejected() {
        let today = Utc::now().date_naive();
        assert!(future_due_date(Some(today)).is_ok());
        assert!(future_due_date(Some(today - Duration::days(1))).is_err());
    }

    #[test]
    fn email_shape() {
        assert_eq!(email(" Ana@Example.com ").unwrap(), "ana@example.com");
        for bad in ["ana", "@example.com", "ana@", "ana@example", "a b@example.com", "a@b@c.com"] {
            assert!(email(bad).is_err(), "{bad}");
        }
    }
}
