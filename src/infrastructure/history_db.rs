//! `SQLite` reader for Chromium-family `History` databases.
//!
//! Reads the `urls` and `visits` tables and converts Chromium's
//! microseconds-since-1601 timestamps to epoch milliseconds.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::application::HistorySource;
use crate::domain::{AppError, DateRange, HistoryEntry, Result, TransitionType, VisitRecord};

/// Microseconds between 1601-01-01 and 1970-01-01.
const WEBKIT_EPOCH_OFFSET_US: i64 = 11_644_473_600_000_000;

/// Low byte of a Chromium transition holds the core type.
const CORE_TRANSITION_MASK: i64 = 0xFF;

/// Converts a Chromium timestamp to epoch milliseconds.
#[must_use]
pub const fn webkit_to_epoch_ms(webkit_us: i64) -> i64 {
    if webkit_us <= 0 {
        return 0;
    }
    (webkit_us - WEBKIT_EPOCH_OFFSET_US) / 1000
}

/// Converts epoch milliseconds to a Chromium timestamp.
#[must_use]
pub const fn epoch_ms_to_webkit(epoch_ms: i64) -> i64 {
    epoch_ms.saturating_mul(1000).saturating_add(WEBKIT_EPOCH_OFFSET_US)
}

/// Decodes a Chromium transition integer to its code.
#[must_use]
pub fn transition_code(raw: i64) -> Option<&'static str> {
    let core = usize::try_from(raw & CORE_TRANSITION_MASK).ok()?;
    TransitionType::ALL.get(core).map(|t| t.code())
}

/// Escapes the characters `SQLite` treats as URI syntax in a file path.
fn uri_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            '?' => out.push_str("%3F"),
            '#' => out.push_str("%23"),
            _ => out.push(c),
        }
    }
    out
}

/// Read-only history source over a Chromium `History` file.
#[derive(Clone)]
pub struct ChromiumHistoryDb {
    conn: Arc<Mutex<Connection>>,
}

impl ChromiumHistoryDb {
    /// Opens a history database in read-only mode.
    ///
    /// The file is opened as immutable so a running browser's lock
    /// does not block the export.
    ///
    /// # Errors
    /// Returns error if the file is missing or cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AppError::DatabaseNotFound {
                path: path.to_path_buf(),
            });
        }

        let uri = format!("file:{}?immutable=1", uri_path(path));
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(uri, flags).map_err(AppError::database)?;

        conn.execute_batch(
            "PRAGMA query_only = ON;
             PRAGMA temp_store = MEMORY;",
        )
        .map_err(AppError::database)?;

        tracing::debug!("Opened history database: {}", path.display());

        Ok(Self::from_connection(conn))
    }

    /// Wraps an existing connection.
    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs a query on the blocking pool.
    async fn with_conn<T, F>(&self, query: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| AppError::Database {
                message: "history connection poisoned".into(),
                source: None,
            })?;
            query(&conn)
        })
        .await
        .map_err(|e| AppError::upstream(format!("History query task failed: {e}")))?
    }
}

fn search_entries(conn: &Connection, range: DateRange) -> Result<Vec<HistoryEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, url, title, visit_count, typed_count, last_visit_time
             FROM urls
             WHERE hidden = 0 AND last_visit_time BETWEEN ?1 AND ?2",
        )
        .map_err(AppError::database)?;

    let rows = stmt
        .query_map(
            params![
                epoch_ms_to_webkit(range.start_time),
                // Whole final millisecond.
                epoch_ms_to_webkit(range.end_time.saturating_add(1)) - 1
            ],
            |row| {
                Ok(HistoryEntry {
                    id: row.get::<_, i64>(0)?.to_string(),
                    url: row.get(1)?,
                    title: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    visit_count: row.get::<_, Option<i64>>(3)?.unwrap_or_default(),
                    typed_count: row.get::<_, Option<i64>>(4)?.unwrap_or_default(),
                    last_visit_time: webkit_to_epoch_ms(row.get::<_, Option<i64>>(5)?.unwrap_or_default()),
                })
            },
        )
        .map_err(AppError::database)?;

    let mut entries = Vec::new();
    for row in rows {
        match row {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!("Failed to read history row: {}", e);
            }
        }
    }

    tracing::debug!("Fetched {} history entries", entries.len());

    Ok(entries)
}

fn visits_for_url(conn: &Connection, url: &str) -> Result<Vec<VisitRecord>> {
    let url_id: Option<i64> = conn
        .query_row("SELECT id FROM urls WHERE url = ?1", [url], |row| row.get(0))
        .optional()
        .map_err(AppError::database)?;

    let Some(url_id) = url_id else {
        return Err(AppError::upstream(format!("Unknown URL: {url}")));
    };

    let mut stmt = conn
        .prepare(
            "SELECT id, visit_time, from_visit, transition
             FROM visits
             WHERE url = ?1
             ORDER BY visit_time",
        )
        .map_err(AppError::database)?;

    let visits = stmt
        .query_map([url_id], |row| {
            let from_visit: Option<i64> = row.get(2)?;
            let transition: Option<i64> = row.get(3)?;
            Ok(VisitRecord {
                visit_id: row.get::<_, i64>(0)?.to_string(),
                visit_time: webkit_to_epoch_ms(row.get(1)?),
                referring_visit_id: from_visit.filter(|&id| id > 0).map(|id| id.to_string()),
                transition: transition.and_then(transition_code).map(str::to_string),
            })
        })
        .map_err(AppError::database)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(AppError::database)?;

    Ok(visits)
}

#[async_trait]
impl HistorySource for ChromiumHistoryDb {
    async fn search(&self, range: DateRange) -> Result<Vec<HistoryEntry>> {
        self.with_conn(move |conn| search_entries(conn, range)).await
    }

    async fn get_visits(&self, url: &str) -> Result<Vec<VisitRecord>> {
        let url = url.to_string();
        self.with_conn(move |conn| visits_for_url(conn, &url)).await
    }
}
