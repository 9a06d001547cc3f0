//! Download sinks: write finished exports to disk or stdout.

use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::application::DownloadSink;
use crate::domain::{AppError, Result};

/// Saves exports as files in a directory.
#[derive(Debug, Clone)]
pub struct FileDownloader {
    dir: PathBuf,
}

impl FileDownloader {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Where a file named `filename` will be written.
    #[must_use]
    pub fn target(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }
}

#[async_trait]
impl DownloadSink for FileDownloader {
    async fn deliver(&self, content: &str, mime_type: &str, filename: &str) -> Result<()> {
        if !self.dir.as_os_str().is_empty() && !self.dir.exists() {
            std::fs::create_dir_all(&self.dir).map_err(|e| {
                AppError::io(format!("Failed to create directory {}", self.dir.display()), e)
            })?;
        }

        let path = self.target(filename);
        let mut file = std::fs::File::create(&path)
            .map_err(|e| AppError::io(format!("Failed to create {}", path.display()), e))?;
        file.write_all(content.as_bytes())
            .map_err(|e| AppError::io("Failed to write file", e))?;

        tracing::info!(path = %path.display(), mime = mime_type, "Saved export");

        Ok(())
    }
}

/// Writes exports to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutDownloader;

#[async_trait]
impl DownloadSink for StdoutDownloader {
    async fn deliver(&self, content: &str, mime_type: &str, filename: &str) -> Result<()> {
        tracing::debug!(mime = mime_type, filename, "Writing export to stdout");

        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{content}")
            .and_then(|()| stdout.flush())
            .map_err(|e| AppError::io("Failed to write to stdout", e))
    }
}
