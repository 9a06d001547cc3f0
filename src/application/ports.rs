//! Collaborator traits the export flow depends on.
//!
//! Adapters live in the infrastructure layer; tests supply in-memory fakes.

use async_trait::async_trait;

use crate::domain::{DateRange, HistoryEntry, Result, VisitRecord};

/// Browser history query interface.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// All entries whose last visit falls in `range`, unordered and unpaginated.
    async fn search(&self, range: DateRange) -> Result<Vec<HistoryEntry>>;

    /// All recorded visits for `url`.
    async fn get_visits(&self, url: &str) -> Result<Vec<VisitRecord>>;
}

/// Best-effort key-value settings storage.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Value stored under `key`, or `None` when absent or unreadable.
    async fn get(&self, key: &str) -> Option<serde_json::Value>;

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

/// Hands finished export content to the user.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    async fn deliver(&self, content: &str, mime_type: &str, filename: &str) -> Result<()>;
}
