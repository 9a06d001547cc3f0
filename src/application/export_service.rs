//! Export orchestration.
//!
//! Validates the configuration, enriches history for the resolved range,
//! serializes the rows and hands the result to the download sink.

use std::sync::Arc;

use crate::domain::{EnrichmentStats, ExportConfig, Result};

use super::date_format::DateFormatter;
use super::enrichment::{HistoryEnricher, DEFAULT_BATCH_SIZE};
use super::ports::{DownloadSink, HistorySource, SettingsStore};
use super::serializer::serialize;

/// Settings key the last successful export configuration is stored under.
pub const CONFIG_KEY: &str = "outputConfig";

/// Result of an export attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// A file was produced and delivered.
    Exported {
        filename: String,
        rows: usize,
        bytes: usize,
        stats: EnrichmentStats,
    },
    /// The range matched no visits; nothing was delivered.
    Empty { stats: EnrichmentStats },
}

/// Reads the last saved configuration; absent or malformed records yield defaults.
pub async fn load_persisted_config(store: &dyn SettingsStore) -> ExportConfig {
    match store.get(CONFIG_KEY).await {
        Some(value) => ExportConfig::from_persisted(value).unwrap_or_default(),
        None => ExportConfig::default(),
    }
}

/// Forgets the saved configuration.
///
/// # Errors
/// Returns error if the settings store cannot be updated.
pub async fn forget_persisted_config(store: &dyn SettingsStore) -> Result<()> {
    store.remove(CONFIG_KEY).await
}

/// Runs exports against injected collaborators.
pub struct ExportService {
    history: Arc<dyn HistorySource>,
    settings: Arc<dyn SettingsStore>,
    download: Arc<dyn DownloadSink>,
    formatter: DateFormatter,
    batch_size: usize,
}

impl ExportService {
    #[must_use]
    pub fn new(
        history: Arc<dyn HistorySource>,
        settings: Arc<dyn SettingsStore>,
        download: Arc<dyn DownloadSink>,
        formatter: DateFormatter,
    ) -> Self {
        Self {
            history,
            settings,
            download,
            formatter,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Loads the persisted configuration, falling back to defaults.
    pub async fn load_config(&self) -> ExportConfig {
        load_persisted_config(self.settings.as_ref()).await
    }

    /// Exports history for `config`, with relative ranges ending at `now_ms`.
    ///
    /// # Errors
    /// Returns a validation error before any lookup when the configuration
    /// is unusable, or the underlying failure from the history source,
    /// serializer or download sink.
    pub async fn export(&self, config: &ExportConfig, now_ms: i64) -> Result<ExportOutcome> {
        config.validate()?;
        let range = config.resolve_range(now_ms)?;

        let (rows, stats) = HistoryEnricher::new(self.history.as_ref(), &self.formatter)
            .with_batch_size(self.batch_size)
            .enrich(range)
            .await?;

        if rows.is_empty() {
            tracing::info!("No history found for the selected range");
            return Ok(ExportOutcome::Empty { stats });
        }

        let content = serialize(&rows, config.format, config.fields)?;
        let filename = config.format.filename();

        self.download
            .deliver(&content, config.format.mime_type(), &filename)
            .await?;

        tracing::info!(
            format = %config.format,
            rows = rows.len(),
            bytes = content.len(),
            "Export delivered"
        );

        self.remember(config).await;

        Ok(ExportOutcome::Exported {
            filename,
            rows: rows.len(),
            bytes: content.len(),
            stats,
        })
    }

    /// Persists `config`; failures are logged and never surfaced.
    async fn remember(&self, config: &ExportConfig) {
        let value = match config.to_persisted() {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to encode export settings: {}", e);
                return;
            }
        };

        if let Err(e) = self.settings.set(CONFIG_KEY, value).await {
            tracing::warn!("Failed to save export settings: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::application::enrichment::tests::FakeHistory;
    use crate::domain::{AppError, DateRange, ExportFormat, Field, FieldMask, HistoryRange};

    #[derive(Default)]
    struct MemorySettings {
        values: Mutex<HashMap<String, serde_json::Value>>,
        fail_writes: bool,
    }

    #[async_trait]
    impl SettingsStore for MemorySettings {
        async fn get(&self, key: &str) -> Option<serde_json::Value> {
            self.values.lock().ok()?.get(key).cloned()
        }

        async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
            if self.fail_writes {
                return Err(AppError::Config {
                    message: "storage quota exceeded".into(),
                });
            }
            if let Ok(mut values) = self.values.lock() {
                values.insert(key.to_string(), value);
            }
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<()> {
            if let Ok(mut values) = self.values.lock() {
                values.remove(key);
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct CapturedDownloads {
        files: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl DownloadSink for CapturedDownloads {
        async fn deliver(&self, content: &str, mime_type: &str, filename: &str) -> Result<()> {
            if let Ok(mut files) = self.files.lock() {
                files.push((content.into(), mime_type.into(), filename.into()));
            }
            Ok(())
        }
    }

    struct Harness {
        service: ExportService,
        settings: Arc<MemorySettings>,
        downloads: Arc<CapturedDownloads>,
    }

    fn harness(history: FakeHistory, settings: MemorySettings) -> Harness {
        let settings = Arc::new(settings);
        let downloads = Arc::new(CapturedDownloads::default());
        let service = ExportService::new(
            Arc::new(history),
            settings.clone(),
            downloads.clone(),
            DateFormatter::new("%Y-%m-%d", true).unwrap(),
        );
        Harness {
            service,
            settings,
            downloads,
        }
    }

    fn custom_config(format: ExportFormat) -> ExportConfig {
        ExportConfig {
            format,
            history_range: HistoryRange::Custom,
            date_range: Some(DateRange::new(0, 1000)),
            fields: FieldMask::only(&[Field::Order, Field::Url]),
        }
    }

    #[tokio::test]
    async fn test_export_delivers_and_persists_config() {
        let history = FakeHistory::default()
            .with_entry("https://a.example", &[100, 200])
            .with_entry("https://b.example", &[150]);
        let h = harness(history, MemorySettings::default());
        let config = custom_config(ExportFormat::Csv);

        let outcome = h.service.export(&config, 5000).await.unwrap();

        assert!(matches!(
            outcome,
            ExportOutcome::Exported { rows: 3, ref filename, .. } if filename == "history-export.csv"
        ));
        {
            let files = h.downloads.files.lock().unwrap();
            assert_eq!(files.len(), 1);
            assert_eq!(files[0].1, "text/csv");
            assert_eq!(
                files[0].0,
                "Order,URL\n1,https://a.example\n2,https://b.example\n3,https://a.example"
            );
        }
        assert_eq!(h.service.load_config().await, config);
        assert!(h.settings.values.lock().unwrap().contains_key(CONFIG_KEY));
    }

    #[tokio::test]
    async fn test_empty_result_produces_no_file() {
        let history = FakeHistory::default().with_entry("https://a.example", &[5000]);
        let h = harness(history, MemorySettings::default());

        let outcome = h
            .service
            .export(&custom_config(ExportFormat::Json), 9000)
            .await
            .unwrap();

        assert!(matches!(outcome, ExportOutcome::Empty { .. }));
        assert!(h.downloads.files.lock().unwrap().is_empty());
        assert!(h.settings.values.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validation_error_skips_lookup() {
        let history = FakeHistory {
            search_error: Some("should not be called".into()),
            ..Default::default()
        };
        let h = harness(history, MemorySettings::default());
        let config = ExportConfig {
            history_range: HistoryRange::Custom,
            date_range: None,
            ..Default::default()
        };

        let err = h.service.export(&config, 1000).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_upstream_failure_message_is_verbatim() {
        let history = FakeHistory {
            search_error: Some("History API is unavailable".into()),
            ..Default::default()
        };
        let h = harness(history, MemorySettings::default());

        let err = h
            .service
            .export(&custom_config(ExportFormat::Html), 1000)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "History API is unavailable");
    }

    #[tokio::test]
    async fn test_failed_settings_write_does_not_fail_export() {
        let history = FakeHistory::default().with_entry("https://a.example", &[100]);
        let settings = MemorySettings {
            fail_writes: true,
            ..Default::default()
        };
        let h = harness(history, settings);

        let outcome = h.service.export(&custom_config(ExportFormat::Html), 1000).await;
        assert!(matches!(outcome, Ok(ExportOutcome::Exported { rows: 1, .. })));
        assert_eq!(h.downloads.files.lock().unwrap()[0].1, "text/html");
    }

    #[tokio::test]
    async fn test_invalid_persisted_config_falls_back_to_defaults() {
        let settings = MemorySettings::default();
        settings.values.lock().unwrap().insert(
            CONFIG_KEY.into(),
            json!({"format": "csv", "historyRange": "day", "dateRange": null, "fields": "title"}),
        );
        let h = harness(FakeHistory::default(), settings);

        assert_eq!(h.service.load_config().await, ExportConfig::default());
    }

    #[tokio::test]
    async fn test_forget_persisted_config() {
        let settings = MemorySettings::default();
        settings.values.lock().unwrap().insert(
            CONFIG_KEY.into(),
            custom_config(ExportFormat::Csv).to_persisted().unwrap(),
        );
        let h = harness(FakeHistory::default(), settings);

        forget_persisted_config(h.settings.as_ref()).await.unwrap();
        assert_eq!(h.service.load_config().await, ExportConfig::default());
    }
}
