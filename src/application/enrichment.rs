//! History enrichment.
//!
//! Joins history entries with their visits, keeps visits inside the
//! requested range, and flattens the result into ordered output rows.

use futures::future::join_all;

use crate::domain::{
    is_web_url, DateRange, EnrichmentStats, HistoryEntry, OutputRow, Result, TransitionType,
    VisitRecord,
};

use super::date_format::DateFormatter;
use super::ports::HistorySource;

/// Entries whose visits are looked up concurrently.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Outcome of one entry's visit lookup.
#[derive(Debug)]
pub enum VisitLookup {
    Found(Vec<VisitRecord>),
    Failed { reason: String },
}

impl VisitLookup {
    /// Visits found, treating a failed lookup as none.
    #[must_use]
    pub fn into_visits(self) -> Vec<VisitRecord> {
        match self {
            Self::Found(visits) => visits,
            Self::Failed { .. } => Vec::new(),
        }
    }
}

/// Builds output rows from a history source.
pub struct HistoryEnricher<'a> {
    source: &'a dyn HistorySource,
    formatter: &'a DateFormatter,
    batch_size: usize,
}

impl<'a> HistoryEnricher<'a> {
    #[must_use]
    pub fn new(source: &'a dyn HistorySource, formatter: &'a DateFormatter) -> Self {
        Self {
            source,
            formatter,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Produces rows for every visit inside `range`, most recent first.
    ///
    /// Visit lookups run concurrently within a batch; batches run one after
    /// another. A failed lookup is logged and contributes no rows.
    ///
    /// # Errors
    /// Returns error if the history search itself fails.
    pub async fn enrich(&self, range: DateRange) -> Result<(Vec<OutputRow>, EnrichmentStats)> {
        let entries = self.source.search(range).await?;
        let mut stats = EnrichmentStats {
            entries: entries.len(),
            ..Default::default()
        };

        tracing::info!(
            entries = entries.len(),
            start = range.start_time,
            end = range.end_time,
            "Fetched history entries"
        );

        let mut rows = Vec::new();

        for (batch_index, batch) in entries.chunks(self.batch_size).enumerate() {
            let lookups = join_all(batch.iter().map(|entry| self.lookup(entry))).await;

            for (entry, lookup) in batch.iter().zip(lookups) {
                if let VisitLookup::Failed { reason } = &lookup {
                    stats.failed_lookups += 1;
                    tracing::warn!(url = %entry.url, "Skipping entry, visit lookup failed: {}", reason);
                }

                let visits = lookup.into_visits();
                stats.visits_seen += visits.len();

                rows.extend(
                    visits
                        .into_iter()
                        .filter(|visit| range.contains(visit.visit_time))
                        .map(|visit| self.build_row(entry, visit)),
                );
            }

            tracing::debug!(batch = batch_index, size = batch.len(), "Processed batch");
        }

        // Stable: equal timestamps keep batch order.
        rows.sort_by(|a, b| b.visit_time.cmp(&a.visit_time));
        for (index, row) in rows.iter_mut().enumerate() {
            row.order = index + 1;
        }

        stats.rows = rows.len();
        tracing::info!(
            rows = stats.rows,
            failed = stats.failed_lookups,
            "Enrichment complete"
        );

        Ok((rows, stats))
    }

    async fn lookup(&self, entry: &HistoryEntry) -> VisitLookup {
        match self.source.get_visits(&entry.url).await {
            Ok(visits) => VisitLookup::Found(visits),
            Err(e) => VisitLookup::Failed {
                reason: e.to_string(),
            },
        }
    }

    fn build_row(&self, entry: &HistoryEntry, visit: VisitRecord) -> OutputRow {
        let transition = TransitionType::from_code(visit.transition.as_deref());

        OutputRow {
            order: 0,
            id: entry.id.clone(),
            visit_time: visit.visit_time,
            visit_time_formatted: self.formatter.format(visit.visit_time),
            last_visit_time: entry.last_visit_time,
            last_visit_time_formatted: self.formatter.format(entry.last_visit_time),
            title: entry.title.clone(),
            url: entry.url.clone(),
            visit_count: entry.visit_count,
            typed_count: entry.typed_count,
            transition,
            transition_label: transition.label(),
            is_web_url: is_web_url(&entry.url),
            referring_visit_id: visit.referring_visit_id,
            visit_id: visit.visit_id,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::domain::AppError;

    /// In-memory history source keyed by URL.
    #[derive(Default)]
    pub struct FakeHistory {
        pub entries: Vec<HistoryEntry>,
        pub visits: HashMap<String, Vec<VisitRecord>>,
        pub failing_urls: Vec<String>,
        pub search_error: Option<String>,
        pub in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
    }

    impl FakeHistory {
        pub fn with_entry(mut self, url: &str, visit_times: &[i64]) -> Self {
            let id = (self.entries.len() + 1).to_string();
            self.entries.push(HistoryEntry {
                id: id.clone(),
                url: url.to_string(),
                title: format!("Title {id}"),
                visit_count: visit_times.len() as i64,
                typed_count: 0,
                last_visit_time: visit_times.iter().copied().max().unwrap_or(0),
            });
            let visits = visit_times
                .iter()
                .enumerate()
                .map(|(i, &t)| VisitRecord {
                    visit_id: format!("{id}-{i}"),
                    visit_time: t,
                    referring_visit_id: None,
                    transition: Some("typed".into()),
                })
                .collect();
            self.visits.insert(url.to_string(), visits);
            self
        }
    }

    #[async_trait]
    impl HistorySource for FakeHistory {
        async fn search(&self, _range: DateRange) -> Result<Vec<HistoryEntry>> {
            if let Some(message) = &self.search_error {
                return Err(AppError::upstream(message.clone()));
            }
            Ok(self.entries.clone())
        }

        async fn get_visits(&self, url: &str) -> Result<Vec<VisitRecord>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing_urls.iter().any(|u| u == url) {
                return Err(AppError::upstream(format!("lookup failed for {url}")));
            }
            Ok(self.visits.get(url).cloned().unwrap_or_default())
        }
    }

    fn formatter() -> DateFormatter {
        DateFormatter::new("%Y-%m-%d", true).unwrap()
    }

    #[tokio::test]
    async fn test_rows_sorted_descending_with_dense_order() {
        let source = FakeHistory::default()
            .with_entry("https://a.example", &[100, 200])
            .with_entry("https://b.example", &[150]);
        let fmt = formatter();

        let (rows, stats) = HistoryEnricher::new(&source, &fmt)
            .enrich(DateRange::new(0, 1000))
            .await
            .unwrap();

        let times: Vec<i64> = rows.iter().map(|r| r.visit_time).collect();
        let orders: Vec<usize> = rows.iter().map(|r| r.order).collect();
        assert_eq!(times, vec![200, 150, 100]);
        assert_eq!(orders, vec![1, 2, 3]);
        assert_eq!(rows[1].url, "https://b.example");
        assert_eq!(stats.rows, 3);
        assert_eq!(stats.entries, 2);
    }

    #[tokio::test]
    async fn test_visits_outside_range_are_dropped() {
        let source = FakeHistory::default()
            .with_entry("https://old.example", &[50])
            .with_entry("https://new.example", &[500]);
        let fmt = formatter();

        let (rows, _) = HistoryEnricher::new(&source, &fmt)
            .enrich(DateRange::new(100, 1000))
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert!(rows.iter().all(|r| r.url != "https://old.example"));
    }

    #[tokio::test]
    async fn test_failed_lookup_is_isolated() {
        let mut source = FakeHistory::default()
            .with_entry("https://ok.example", &[300])
            .with_entry("https://broken.example", &[400]);
        source.failing_urls.push("https://broken.example".into());
        let fmt = formatter();

        let (rows, stats) = HistoryEnricher::new(&source, &fmt)
            .enrich(DateRange::new(0, 1000))
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].url, "https://ok.example");
        assert_eq!(stats.failed_lookups, 1);
    }

    #[tokio::test]
    async fn test_search_failure_propagates() {
        let source = FakeHistory {
            search_error: Some("history unavailable".into()),
            ..Default::default()
        };
        let fmt = formatter();

        let err = HistoryEnricher::new(&source, &fmt)
            .enrich(DateRange::new(0, 1000))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "history unavailable");
    }

    #[tokio::test]
    async fn test_equal_timestamps_keep_batch_order() {
        let source = FakeHistory::default()
            .with_entry("https://first.example", &[100])
            .with_entry("https://second.example", &[100])
            .with_entry("https://third.example", &[100]);
        let fmt = formatter();

        let (rows, _) = HistoryEnricher::new(&source, &fmt)
            .with_batch_size(2)
            .enrich(DateRange::new(0, 1000))
            .await
            .unwrap();

        let urls: Vec<&str> = rows.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://first.example", "https://second.example", "https://third.example"]
        );
    }

    #[tokio::test]
    async fn test_batches_bound_concurrency() {
        let mut source = FakeHistory::default();
        for i in 0..7 {
            source = source.with_entry(&format!("https://{i}.example"), &[10]);
        }
        let fmt = formatter();

        HistoryEnricher::new(&source, &fmt)
            .with_batch_size(3)
            .enrich(DateRange::new(0, 1000))
            .await
            .unwrap();

        assert!(source.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_row_fields_are_derived() {
        let mut source = FakeHistory::default().with_entry("chrome://settings", &[100]);
        if let Some(visits) = source.visits.get_mut("chrome://settings") {
            visits[0].transition = Some("garbage".into());
            visits[0].referring_visit_id = Some("7".into());
        }
        let fmt = formatter();

        let (rows, _) = HistoryEnricher::new(&source, &fmt)
            .enrich(DateRange::new(0, 1000))
            .await
            .unwrap();

        let row = &rows[0];
        assert_eq!(row.transition, TransitionType::Link);
        assert_eq!(row.transition_label, "Clicked Link");
        assert!(!row.is_web_url);
        assert_eq!(row.referring_visit_id.as_deref(), Some("7"));
        assert_eq!(row.visit_time_formatted, "1970-01-01");
        assert_eq!(row.title, "Title 1");
    }
}
