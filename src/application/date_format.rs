//! Timestamp formatting for exported rows.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};

use crate::domain::{AppError, ExportSettings, Result};

/// Formats epoch-millisecond timestamps with a `strftime` pattern.
#[derive(Debug, Clone)]
pub struct DateFormatter {
    pattern: String,
    utc: bool,
}

impl DateFormatter {
    /// Creates a formatter, rejecting patterns chrono cannot render.
    ///
    /// # Errors
    /// Returns a configuration error for an invalid pattern.
    pub fn new(pattern: impl Into<String>, utc: bool) -> Result<Self> {
        let pattern = pattern.into();
        if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
            return Err(AppError::Config {
                message: format!("Invalid date format: {pattern}"),
            });
        }
        Ok(Self { pattern, utc })
    }

    /// Builds a formatter from the `[export]` settings.
    ///
    /// # Errors
    /// Returns a configuration error for an invalid pattern.
    pub fn from_settings(settings: &ExportSettings) -> Result<Self> {
        Self::new(settings.date_format.clone(), settings.utc)
    }

    /// Formats `timestamp_ms`; out-of-range timestamps render empty.
    #[must_use]
    pub fn format(&self, timestamp_ms: i64) -> String {
        let Some(dt) = DateTime::from_timestamp_millis(timestamp_ms) else {
            tracing::debug!("Timestamp out of range: {}", timestamp_ms);
            return String::new();
        };

        let mut out = String::new();
        let written = if self.utc {
            write!(out, "{}", dt.format(&self.pattern))
        } else {
            write!(out, "{}", dt.with_timezone(&Local).format(&self.pattern))
        };

        if written.is_err() {
            tracing::debug!("Failed to format timestamp {}", timestamp_ms);
            out.clear();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_utc() {
        let fmt = DateFormatter::new("%Y-%m-%d %H:%M:%S", true).unwrap();
        assert_eq!(fmt.format(0), "1970-01-01 00:00:00");
        assert_eq!(fmt.format(1_700_000_000_000), "2023-11-14 22:13:20");
    }

    #[test]
    fn test_default_pattern_is_us_style() {
        let fmt = DateFormatter::from_settings(&ExportSettings {
            utc: true,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(fmt.format(1_700_000_000_000), "11/14/2023, 10:13:20 PM");
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(DateFormatter::new("%Q", true).is_err());
    }

    #[test]
    fn test_out_of_range_timestamp_is_empty() {
        let fmt = DateFormatter::new("%Y", true).unwrap();
        assert_eq!(fmt.format(i64::MAX), "");
    }
}
