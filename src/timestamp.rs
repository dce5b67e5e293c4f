//! Boundary timestamp format.
//!
//! History queries take their lower bound as text, e.g. `2019-01-01 12:00:00`.
//! The text carries no zone; it is read in the configured fixed offset.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use std::fmt::Write;

use crate::error::{Error, Result};

/// `yyyy-MM-dd HH:mm:ss`
pub const DEFAULT_TIMESTAMP_PATTERN: &str = "%Y-%m-%d %H:%M:%S";

/// Pattern and offset used to parse and format boundary timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampFormat {
    pattern: String,
    offset: FixedOffset,
}

impl TimestampFormat {
    /// Build a format, rejecting patterns that chrono cannot interpret or
    /// whose output does not parse back to the same minute.
    pub fn new(pattern: impl Into<String>, offset: FixedOffset) -> Result<Self> {
        let pattern = pattern.into();
        if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
            return Err(Error::Config(format!("invalid timestamp pattern: {pattern}")));
        }
        check_round_trip(&pattern)?;
        Ok(Self { pattern, offset })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Parse boundary text into an instant.
    pub fn parse(&self, input: &str) -> Result<DateTime<Utc>> {
        let naive = NaiveDateTime::parse_from_str(input.trim(), &self.pattern).map_err(|e| {
            Error::InvalidTimestamp {
                input: input.to_string(),
                reason: e.to_string(),
            }
        })?;
        self.offset
            .from_local_datetime(&naive)
            .single()
            .map(|at| at.with_timezone(&Utc))
            .ok_or_else(|| Error::InvalidTimestamp {
                input: input.to_string(),
                reason: "ambiguous local time".to_string(),
            })
    }

    /// Format an instant as boundary text.
    pub fn format(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset)
            .format(&self.pattern)
            .to_string()
    }
}

impl Default for TimestampFormat {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_TIMESTAMP_PATTERN.to_string(),
            offset: utc_offset(),
        }
    }
}

/// Parse an offset such as `+00:00` or `-05:30`.
pub fn parse_offset(s: &str) -> Result<FixedOffset> {
    s.trim()
        .parse::<FixedOffset>()
        .map_err(|e| Error::Config(format!("invalid timestamp offset {s:?}: {e}")))
}

/// Format a reference instant with `pattern` and require it to parse back
/// unchanged. Patterns without a full date and minute fail here.
fn check_round_trip(pattern: &str) -> Result<()> {
    let reference = NaiveDate::from_ymd_opt(2001, 2, 3)
        .and_then(|d| d.and_hms_opt(4, 5, 0))
        .ok_or_else(|| Error::Other("reference instant out of range".to_string()))?;

    let mut text = String::new();
    if write!(text, "{}", reference.format(pattern)).is_err() {
        return Err(Error::Config(format!(
            "timestamp pattern {pattern:?} cannot format a local date-time"
        )));
    }
    match NaiveDateTime::parse_from_str(&text, pattern) {
        Ok(parsed) if parsed == reference => Ok(()),
        Ok(parsed) => Err(Error::Config(format!(
            "timestamp pattern {pattern:?} does not round-trip: {text:?} parsed as {parsed}"
        ))),
        Err(e) => Err(Error::Config(format!(
            "timestamp pattern {pattern:?} cannot be parsed back: {e}"
        ))),
    }
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}
