//! Caller-supplied instants.

use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::str::FromStr;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// An instant supplied by a caller.
///
/// Requests need timezone-aware instants. Naive values can still be
/// represented so that unqualified input is rejected with a validation error
/// at the point of use instead of being silently reinterpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePoint {
    /// An instant with a known UTC offset.
    Aware(DateTime<FixedOffset>),
    /// A wall-clock time with no timezone information.
    Naive(NaiveDateTime),
}

impl TimePoint {
    /// Parse an RFC 3339 timestamp, falling back to naive date/time forms.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(Self::Aware(dt));
        }

        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
                return Ok(Self::Naive(naive));
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d")
            && let Some(naive) = date.and_hms_opt(0, 0, 0)
        {
            return Ok(Self::Naive(naive));
        }

        Err(Error::validation(format!("unrecognised timestamp '{input}'")))
    }

    /// Whether the instant carries timezone information.
    pub fn is_aware(&self) -> bool {
        matches!(self, Self::Aware(_))
    }

    /// Convert to UTC, failing for naive values.
    pub fn to_utc(&self) -> Result<DateTime<Utc>> {
        match self {
            Self::Aware(dt) => Ok(dt.with_timezone(&Utc)),
            Self::Naive(naive) => Err(Error::validation(format!(
                "timestamp {naive} has no timezone information"
            ))),
        }
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for TimePoint {
    fn from(dt: DateTime<Tz>) -> Self {
        Self::Aware(dt.fixed_offset())
    }
}

impl From<NaiveDateTime> for TimePoint {
    fn from(naive: NaiveDateTime) -> Self {
        Self::Naive(naive)
    }
}

impl FromStr for TimePoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for TimePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aware(dt) => write!(f, "{}", dt.to_rfc3339()),
            Self::Naive(naive) => write!(f, "{}", naive.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}
