//! Application layer - use cases and orchestration.
//!
//! This layer contains the history enrichment pipeline, the output
//! serializer and the export flow that ties them to the collaborators.

pub mod date_format;
pub mod enrichment;
pub mod export_service;
pub mod ports;
pub mod serializer;

pub use date_format::DateFormatter;
pub use export_service::{forget_persisted_config, load_persisted_config, ExportOutcome, ExportService};
pub use ports::{DownloadSink, HistorySource, SettingsStore};
