//! Infrastructure layer - external adapters (database, filesystem).
//!
//! This layer handles all I/O operations and implements the
//! collaborator traits the export flow depends on.

pub mod browser_paths;
pub mod config;
pub mod download;
pub mod history_db;
pub mod settings_store;

pub use browser_paths::{default_history_database, find_history_databases};
pub use config::{config_file_path, ensure_config_exists, load_config};
pub use download::{FileDownloader, StdoutDownloader};
pub use history_db::ChromiumHistoryDb;
pub use settings_store::JsonSettingsStore;
