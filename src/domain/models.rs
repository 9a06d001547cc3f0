//! Domain models for browsing history data.
//!
//! `HistoryEntry` and `VisitRecord` mirror what a history source hands back;
//! `OutputRow` is the flattened unit of export.

use serde::{Deserialize, Serialize};

/// An inclusive time window in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_time: i64,
    pub end_time: i64,
}

impl DateRange {
    #[must_use]
    pub const fn new(start_time: i64, end_time: i64) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// Whether `timestamp` falls inside `[start_time, end_time]`.
    #[must_use]
    pub const fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start_time && timestamp <= self.end_time
    }
}

/// A URL recorded by the browser, with aggregate stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Source-assigned identifier.
    pub id: String,
    /// The visited URL (natural key).
    pub url: String,
    /// Page title, possibly empty.
    #[serde(default)]
    pub title: String,
    /// Number of recorded visits.
    #[serde(default)]
    pub visit_count: i64,
    /// Number of times the URL was typed.
    #[serde(default)]
    pub typed_count: i64,
    /// Last visit, epoch milliseconds.
    #[serde(default)]
    pub last_visit_time: i64,
}

/// One visit event for a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub visit_id: String,
    /// Visit time, epoch milliseconds.
    pub visit_time: i64,
    #[serde(default)]
    pub referring_visit_id: Option<String>,
    /// Raw transition code as reported by the source.
    #[serde(default)]
    pub transition: Option<String>,
}

/// How a page was navigated to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionType {
    #[default]
    Link,
    Typed,
    AutoBookmark,
    AutoSubframe,
    ManualSubframe,
    Generated,
    AutoToplevel,
    FormSubmit,
    Reload,
    Keyword,
    KeywordGenerated,
}

impl TransitionType {
    /// All transition types, in Chromium core-type order.
    pub const ALL: [Self; 11] = [
        Self::Link,
        Self::Typed,
        Self::AutoBookmark,
        Self::AutoSubframe,
        Self::ManualSubframe,
        Self::Generated,
        Self::AutoToplevel,
        Self::FormSubmit,
        Self::Reload,
        Self::Keyword,
        Self::KeywordGenerated,
    ];

    /// Maps a raw code to a transition type; missing or unknown codes become `Link`.
    #[must_use]
    pub fn from_code(code: Option<&str>) -> Self {
        code.and_then(|c| Self::ALL.into_iter().find(|t| t.code() == c))
            .unwrap_or_default()
    }

    /// Wire code, as used by browser history APIs.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::Typed => "typed",
            Self::AutoBookmark => "auto_bookmark",
            Self::AutoSubframe => "auto_subframe",
            Self::ManualSubframe => "manual_subframe",
            Self::Generated => "generated",
            Self::AutoToplevel => "auto_toplevel",
            Self::FormSubmit => "form_submit",
            Self::Reload => "reload",
            Self::Keyword => "keyword",
            Self::KeywordGenerated => "keyword_generated",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Link => "Clicked Link",
            Self::Typed => "Typed URL",
            Self::AutoBookmark => "Opened Bookmark",
            Self::AutoSubframe => "Embedded Frame",
            Self::ManualSubframe => "Frame Navigation",
            Self::Generated => "Address Bar Suggestion",
            Self::AutoToplevel => "Start Page",
            Self::FormSubmit => "Submitted Form",
            Self::Reload => "Reloaded Page",
            Self::Keyword => "Keyword Search",
            Self::KeywordGenerated => "Keyword Generated",
        }
    }
}

impl std::fmt::Display for TransitionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// One exported row: a single visit joined with its history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    /// 1-based position after sorting by visit time descending.
    pub order: usize,
    pub id: String,
    pub visit_time: i64,
    pub visit_time_formatted: String,
    pub last_visit_time: i64,
    pub last_visit_time_formatted: String,
    pub title: String,
    pub url: String,
    pub visit_count: i64,
    pub typed_count: i64,
    pub transition: TransitionType,
    pub transition_label: &'static str,
    pub is_web_url: bool,
    pub referring_visit_id: Option<String>,
    pub visit_id: String,
}

/// Whether a URL uses an `http` or `https` scheme.
#[must_use]
pub fn is_web_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Summary statistics for one enrichment run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentStats {
    /// History entries returned by the search.
    pub entries: usize,
    /// Entries whose visit lookup failed.
    pub failed_lookups: usize,
    /// Visits returned across all lookups, before range filtering.
    pub visits_seen: usize,
    /// Rows produced.
    pub rows: usize,
}
