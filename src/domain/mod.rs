//! Domain layer - core types and errors.
//!
//! This layer contains pure domain models, export configuration
//! and error types without any I/O.

pub mod config;
pub mod error;
pub mod models;
pub mod settings;

pub use config::{ExportConfig, ExportFormat, Field, FieldMask, HistoryRange};
pub use error::{AppError, Result};
pub use models::{
    is_web_url, DateRange, EnrichmentStats, HistoryEntry, OutputRow, TransitionType, VisitRecord,
};
pub use settings::{AppConfig, ExportSettings};
