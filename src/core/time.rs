//! Timestamp parsing.
//!
//! The platform API reports every timestamp as RFC 3339 with a `Z` designator
//! (`2016-06-08T16:41:45Z`). Values are kept as wire strings on the models and
//! parsed here at comparison time so a malformed value can be reported together
//! with the resource it belongs to.

use chrono::{DateTime, Utc};

use super::error::NotifyError;

/// Parse an RFC 3339 timestamp, naming `subject` in the error.
///
/// # Errors
///
/// Returns [`NotifyError::InvalidTimestamp`] when `value` is not RFC 3339.
pub fn parse_timestamp(
    value: &str,
    subject: impl Into<String>,
) -> Result<DateTime<Utc>, NotifyError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| NotifyError::InvalidTimestamp {
            subject: subject.into(),
            value: value.to_string(),
            source,
        })
}
