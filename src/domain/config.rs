//! Export configuration: format, time range and column selection.
//!
//! Also owns the persisted shape of the configuration and the
//! validation applied before reusing a stored record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::{AppError, Result};
use super::models::DateRange;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Target export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    #[default]
    Json,
    Html,
}

impl ExportFormat {
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
            Self::Html => "text/html",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Html => "html",
        }
    }

    /// Download filename, `history-export.<ext>`.
    #[must_use]
    pub fn filename(self) -> String {
        format!("history-export.{}", self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "html" | "htm" => Ok(Self::Html),
            _ => Err(AppError::UnsupportedFormat { format: s.into() }),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Time range selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRange {
    Day,
    #[default]
    Week,
    Month,
    All,
    Custom,
}

impl HistoryRange {
    /// Resolves the selector to concrete bounds ending at `now_ms`.
    ///
    /// # Errors
    /// Returns a validation error for `Custom` without an explicit range.
    pub fn resolve(self, now_ms: i64, custom: Option<DateRange>) -> Result<DateRange> {
        match self {
            Self::Day => Ok(DateRange::new(now_ms - DAY_MS, now_ms)),
            Self::Week => Ok(DateRange::new(now_ms - 7 * DAY_MS, now_ms)),
            Self::Month => Ok(DateRange::new(now_ms - 30 * DAY_MS, now_ms)),
            Self::All => Ok(DateRange::new(0, now_ms)),
            Self::Custom => custom.ok_or_else(|| {
                AppError::validation("Please select both a start and an end date for a custom range")
            }),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::All => "all",
            Self::Custom => "custom",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Day => "Last 24 Hours",
            Self::Week => "Last 7 days",
            Self::Month => "Last 30 days",
            Self::All => "All Time",
            Self::Custom => "Custom Range",
        }
    }
}

impl std::str::FromStr for HistoryRange {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "all" => Ok(Self::All),
            "custom" => Ok(Self::Custom),
            _ => Err(AppError::validation(format!(
                "Unknown range: {s}. Use: day, week, month, all, custom"
            ))),
        }
    }
}

/// An exportable column, declared in canonical output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Order,
    Id,
    VisitTime,
    VisitTimeFormatted,
    LastVisitTime,
    LastVisitTimeFormatted,
    Title,
    Url,
    VisitCount,
    TypedCount,
    Transition,
    TransitionLabel,
    IsWebUrl,
    ReferringVisitId,
    VisitId,
}

impl Field {
    /// Canonical column order.
    pub const ALL: [Self; 15] = [
        Self::Order,
        Self::Id,
        Self::VisitTime,
        Self::VisitTimeFormatted,
        Self::LastVisitTime,
        Self::LastVisitTimeFormatted,
        Self::Title,
        Self::Url,
        Self::VisitCount,
        Self::TypedCount,
        Self::Transition,
        Self::TransitionLabel,
        Self::IsWebUrl,
        Self::ReferringVisitId,
        Self::VisitId,
    ];

    /// Key used in JSON output and persisted masks.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Id => "id",
            Self::VisitTime => "visitTime",
            Self::VisitTimeFormatted => "visitTimeFormatted",
            Self::LastVisitTime => "lastVisitTime",
            Self::LastVisitTimeFormatted => "lastVisitTimeFormatted",
            Self::Title => "title",
            Self::Url => "url",
            Self::VisitCount => "visitCount",
            Self::TypedCount => "typedCount",
            Self::Transition => "transition",
            Self::TransitionLabel => "transitionLabel",
            Self::IsWebUrl => "isWebUrl",
            Self::ReferringVisitId => "referringVisitId",
            Self::VisitId => "visitId",
        }
    }

    /// Column header used in CSV and HTML output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Order => "Order",
            Self::Id => "ID",
            Self::VisitTime => "Visit Time",
            Self::VisitTimeFormatted => "Visit Time Formatted",
            Self::LastVisitTime => "Last Visit Time",
            Self::LastVisitTimeFormatted => "Last Visit Time Formatted",
            Self::Title => "Title",
            Self::Url => "URL",
            Self::VisitCount => "Times visited",
            Self::TypedCount => "Times URL manually entered",
            Self::Transition => "Accessed via",
            Self::TransitionLabel => "Transition Title",
            Self::IsWebUrl => "Web URL",
            Self::ReferringVisitId => "Referring Visit ID",
            Self::VisitId => "Visit ID",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Per-column inclusion flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, bool>", into = "BTreeMap<String, bool>")]
pub struct FieldMask([bool; Field::ALL.len()]);

impl Default for FieldMask {
    fn default() -> Self {
        Self::all()
    }
}

impl FieldMask {
    #[must_use]
    pub const fn all() -> Self {
        Self([true; Field::ALL.len()])
    }

    #[must_use]
    pub const fn none() -> Self {
        Self([false; Field::ALL.len()])
    }

    /// A mask including exactly `fields`.
    #[must_use]
    pub fn only(fields: &[Field]) -> Self {
        let mut mask = Self::none();
        for &field in fields {
            mask.set(field, true);
        }
        mask
    }

    /// Parses a comma-separated list of field keys.
    ///
    /// # Errors
    /// Returns a validation error naming the first unknown key.
    pub fn parse_list(list: &str) -> Result<Self> {
        let fields = list
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|key| {
                Field::from_key(key)
                    .ok_or_else(|| AppError::validation(format!("Unknown field: {key}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::only(&fields))
    }

    #[must_use]
    pub const fn includes(&self, field: Field) -> bool {
        self.0[field.index()]
    }

    pub fn set(&mut self, field: Field, included: bool) {
        self.0[field.index()] = included;
    }

    /// Included fields in canonical order.
    pub fn selected(&self) -> impl Iterator<Item = Field> + '_ {
        Field::ALL.into_iter().filter(|&f| self.includes(f))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|included| !included)
    }
}

impl From<BTreeMap<String, bool>> for FieldMask {
    fn from(map: BTreeMap<String, bool>) -> Self {
        let mut mask = Self::all();
        for (key, included) in map {
            match Field::from_key(&key) {
                Some(field) => mask.set(field, included),
                None => tracing::debug!("Ignoring unknown field in mask: {}", key),
            }
        }
        mask
    }
}

impl From<FieldMask> for BTreeMap<String, bool> {
    fn from(mask: FieldMask) -> Self {
        Field::ALL
            .into_iter()
            .map(|f| (f.key().to_string(), mask.includes(f)))
            .collect()
    }
}

/// User-facing export settings, persisted after each successful export.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfig {
    pub format: ExportFormat,
    pub history_range: HistoryRange,
    pub date_range: Option<DateRange>,
    pub fields: FieldMask,
}

impl ExportConfig {
    /// Checks the configuration before an export is attempted.
    ///
    /// # Errors
    /// Returns a validation error for a custom range without dates
    /// or a mask with no fields selected.
    pub fn validate(&self) -> Result<()> {
        if self.history_range == HistoryRange::Custom && self.date_range.is_none() {
            return Err(AppError::validation(
                "Please select both a start and an end date for a custom range",
            ));
        }
        if self.fields.is_empty() {
            return Err(AppError::validation("Please select at least one field to export"));
        }
        Ok(())
    }

    /// Resolves the effective date range ending at `now_ms`.
    ///
    /// # Errors
    /// Returns a validation error for a custom range without dates.
    pub fn resolve_range(&self, now_ms: i64) -> Result<DateRange> {
        self.history_range.resolve(now_ms, self.date_range)
    }

    /// Rebuilds a configuration from its persisted form.
    ///
    /// Returns `None` when the record fails shape validation: missing
    /// `format`, `historyRange` or `fields`, `fields` not an object of
    /// booleans, or values outside the known selectors.
    #[must_use]
    pub fn from_persisted(value: serde_json::Value) -> Option<Self> {
        match serde_json::from_value::<Self>(value) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Discarding malformed persisted config: {}", e);
                None
            }
        }
    }

    /// Persisted form of the configuration.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn to_persisted(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(AppError::json_parse)
    }
}
