//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use chrono::{Local, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{Parser, Subcommand};

use crate::domain::{AppError, DateRange, ExportConfig, FieldMask, HistoryRange, Result};

/// History Export - Export browser history to CSV, JSON, or HTML.
#[derive(Parser, Debug)]
#[command(name = "history-export")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export browsing history. Unset options reuse the last export's settings.
    Export(ExportArgs),

    /// List exportable fields and whether they are currently selected.
    Fields,

    /// Show discovered browser history databases.
    Browsers,

    /// Manage saved export settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print saved export settings and file locations.
    Show,
    /// Forget saved export settings.
    Reset,
    /// Write a default config.toml if none exists.
    Init,
}

#[derive(clap::Args, Debug, Default)]
pub struct ExportArgs {
    /// Output format: csv, json, or html.
    #[arg(short, long)]
    pub format: Option<String>,

    /// Time range: day, week, month, all, or custom.
    #[arg(short, long)]
    pub range: Option<String>,

    /// First day of a custom range (YYYY-MM-DD, inclusive).
    #[arg(long)]
    pub start: Option<String>,

    /// Last day of a custom range (YYYY-MM-DD, inclusive).
    #[arg(long)]
    pub end: Option<String>,

    /// Comma-separated field keys to include (see `fields`).
    #[arg(long, conflicts_with = "all_fields")]
    pub fields: Option<String>,

    /// Include every field.
    #[arg(long)]
    pub all_fields: bool,

    /// History database to read.
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Directory to write the export to.
    #[arg(short, long, conflicts_with = "stdout")]
    pub output: Option<PathBuf>,

    /// Write the export to stdout instead of a file.
    #[arg(long)]
    pub stdout: bool,
}

impl ExportArgs {
    /// Applies command-line overrides on top of `base`.
    ///
    /// `--start`/`--end` select a custom range; a missing bound defaults
    /// to the other side of `now_ms` or the epoch.
    ///
    /// # Errors
    /// Returns error for unparseable formats, ranges, dates, or field lists.
    pub fn apply(&self, mut base: ExportConfig, now_ms: i64, utc: bool) -> Result<ExportConfig> {
        if let Some(format) = &self.format {
            base.format = format.parse()?;
        }

        if let Some(range) = &self.range {
            base.history_range = range.parse()?;
        }

        if self.start.is_some() || self.end.is_some() {
            let start = self
                .start
                .as_deref()
                .map(|s| parse_day_bound(s, false, utc))
                .transpose()?
                .unwrap_or(0);
            let end = self
                .end
                .as_deref()
                .map(|s| parse_day_bound(s, true, utc))
                .transpose()?
                .unwrap_or(now_ms);
            base.history_range = HistoryRange::Custom;
            base.date_range = Some(DateRange::new(start, end));
        } else if self.range.is_some() && base.history_range != HistoryRange::Custom {
            base.date_range = None;
        }

        if self.all_fields {
            base.fields = FieldMask::all();
        } else if let Some(fields) = &self.fields {
            base.fields = FieldMask::parse_list(fields)?;
        }

        Ok(base)
    }
}

/// Parses `YYYY-MM-DD` to the first (or last) millisecond of that day.
///
/// # Errors
/// Returns a validation error for malformed dates.
pub fn parse_day_bound(value: &str, end_of_day: bool, utc: bool) -> Result<i64> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::validation(format!("Invalid date: {value}. Use YYYY-MM-DD"))
    })?;

    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .ok_or_else(|| AppError::validation("Invalid time of day"))?;

    let naive = date.and_time(time);
    let millis = if utc {
        Some(Utc.from_utc_datetime(&naive).timestamp_millis())
    } else {
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.timestamp_millis())
    };

    millis.ok_or_else(|| AppError::validation(format!("Date does not exist locally: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExportFormat, Field};

    #[test]
    fn test_parse_day_bounds_utc() {
        assert_eq!(parse_day_bound("1970-01-02", false, true).unwrap(), 86_400_000);
        assert_eq!(
            parse_day_bound("1970-01-01", true, true).unwrap(),
            86_400_000 - 1
        );
        assert!(parse_day_bound("01/02/1970", false, true).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let args = ExportArgs {
            format: Some("csv".into()),
            fields: Some("title,url".into()),
            start: Some("1970-01-02".into()),
            ..Default::default()
        };

        let config = args.apply(ExportConfig::default(), 500_000_000, true).unwrap();

        assert_eq!(config.format, ExportFormat::Csv);
        assert_eq!(config.history_range, HistoryRange::Custom);
        assert_eq!(config.date_range, Some(DateRange::new(86_400_000, 500_000_000)));
        assert_eq!(
            config.fields.selected().collect::<Vec<_>>(),
            vec![Field::Title, Field::Url]
        );
    }

    #[test]
    fn test_apply_relative_range_clears_dates() {
        let base = ExportConfig {
            history_range: HistoryRange::Custom,
            date_range: Some(DateRange::new(1, 2)),
            ..Default::default()
        };
        let args = ExportArgs {
            range: Some("month".into()),
            ..Default::default()
        };

        let config = args.apply(base, 0, true).unwrap();
        assert_eq!(config.history_range, HistoryRange::Month);
        assert_eq!(config.date_range, None);
    }

    #[test]
    fn test_apply_keeps_base_without_overrides() {
        let base = ExportConfig {
            format: ExportFormat::Html,
            fields: FieldMask::only(&[Field::Url]),
            ..Default::default()
        };
        let config = ExportArgs::default().apply(base.clone(), 0, true).unwrap();
        assert_eq!(config, base);
    }

    #[test]
    fn test_apply_rejects_unknown_format() {
        let args = ExportArgs {
            format: Some("pdf".into()),
            ..Default::default()
        };
        assert!(matches!(
            args.apply(ExportConfig::default(), 0, true),
            Err(AppError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_cli_parses_export() {
        let cli = Cli::try_parse_from([
            "history-export",
            "-v",
            "export",
            "--format",
            "html",
            "--range",
            "all",
            "--stdout",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Export(args) => {
                assert_eq!(args.format.as_deref(), Some("html"));
                assert!(args.stdout);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
