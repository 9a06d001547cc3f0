//! History Export - Export browser history to CSV, JSON, or HTML.
//!
//! Reads a Chromium-family `History` database, joins every URL with its
//! individual visits, and writes one row per visit in the selected format.
//!
//! QUICK START:
//!   history-export export                          # Reuse last settings (JSON, last 7 days)
//!   history-export export -f csv -r month          # Last 30 days as CSV
//!   history-export export --start 2024-01-01 --end 2024-01-31 -f html
//!   history-export export --fields title,url --stdout
//!   history-export fields                          # Available columns

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    forget_persisted_config, load_persisted_config, DateFormatter, DownloadSink, ExportOutcome,
    ExportService,
};
use cli::{Cli, Commands, ConfigAction, ExportArgs};
use domain::{AppConfig, Field};
use infrastructure::{
    config_file_path, default_history_database, ensure_config_exists, find_history_databases,
    load_config, ChromiumHistoryDb, FileDownloader, JsonSettingsStore, StdoutDownloader,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Main application logic.
async fn run(cli: Cli) -> anyhow::Result<()> {
    let app_config = load_config().context("Failed to load config.toml")?;

    match cli.command {
        Commands::Export(args) => cmd_export(&app_config, &args).await,
        Commands::Fields => cmd_fields(&app_config).await,
        Commands::Browsers => cmd_browsers(),
        Commands::Config { action } => cmd_config(&app_config, action).await,
    }
}

/// Export history command.
async fn cmd_export(app_config: &AppConfig, args: &ExportArgs) -> anyhow::Result<()> {
    let now_ms = chrono::Utc::now().timestamp_millis();
    let settings = Arc::new(JsonSettingsStore::new(app_config.settings_file_path()));

    let base = load_persisted_config(settings.as_ref()).await;
    let config = args.apply(base, now_ms, app_config.export.utc)?;

    let db_path = match args.db.clone().or_else(|| app_config.paths.history_db.clone()) {
        Some(path) => path,
        None => default_history_database()?,
    };
    let history = ChromiumHistoryDb::open(&db_path)
        .with_context(|| format!("Failed to open {}", db_path.display()))?;

    let output_dir = args.output.clone().unwrap_or_else(|| app_config.output_dir());
    let download: Arc<dyn DownloadSink> = if args.stdout {
        Arc::new(StdoutDownloader)
    } else {
        Arc::new(FileDownloader::new(&output_dir))
    };

    let formatter = DateFormatter::from_settings(&app_config.export)?;
    let service = ExportService::new(Arc::new(history), settings, download, formatter)
        .with_batch_size(app_config.export.batch_size);

    tracing::info!(db = %db_path.display(), range = config.history_range.as_str(), "Starting export");

    match service.export(&config, now_ms).await? {
        ExportOutcome::Exported {
            filename,
            rows,
            bytes,
            stats,
        } => {
            tracing::debug!(?stats, "Enrichment summary");
            if stats.failed_lookups > 0 {
                eprintln!(
                    "{} Skipped {} entries whose visits could not be read",
                    "!".yellow().bold(),
                    stats.failed_lookups
                );
            }
            if args.stdout {
                eprintln!("{} Exported {} visits ({} bytes)", "✓".green().bold(), rows, bytes);
            } else {
                println!(
                    "{} Exported {} visits to {} ({} bytes)",
                    "✓".green().bold(),
                    rows,
                    output_dir.join(filename).display(),
                    bytes
                );
            }
        }
        ExportOutcome::Empty { stats } => {
            eprintln!(
                "{} No history found for {} ({} entries checked). Nothing exported.",
                "ℹ".yellow().bold(),
                config.history_range.label(),
                stats.entries
            );
        }
    }

    Ok(())
}

/// List fields command.
async fn cmd_fields(app_config: &AppConfig) -> anyhow::Result<()> {
    let settings = JsonSettingsStore::new(app_config.settings_file_path());
    let config = load_persisted_config(&settings).await;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Key", "Column", "Selected"]);

    for field in Field::ALL {
        let selected = if config.fields.includes(field) { "yes" } else { "-" };
        table.add_row(vec![field.key(), field.label(), selected]);
    }

    println!("{table}");
    Ok(())
}

/// Show history database paths command.
fn cmd_browsers() -> anyhow::Result<()> {
    let profiles = find_history_databases()?;

    println!("{}", "📂 Browser History Databases".bold());
    println!();

    for (i, profile) in profiles.iter().enumerate() {
        println!(
            "  {}. [{}] {} {}",
            i + 1,
            profile.browser.green(),
            profile.profile.blue(),
            profile.history_db.display()
        );
    }

    println!();
    println!("Total: {} database(s)", profiles.len());

    Ok(())
}

/// Manage saved settings command.
async fn cmd_config(app_config: &AppConfig, action: ConfigAction) -> anyhow::Result<()> {
    let settings = JsonSettingsStore::new(app_config.settings_file_path());

    match action {
        ConfigAction::Show => {
            let config = load_persisted_config(&settings).await;
            println!("{} {}", "Config file:".bold(), config_file_path().display());
            println!("{} {}", "Settings file:".bold(), settings.path().display());
            println!();
            println!("{}", serde_json::to_string_pretty(&config.to_persisted()?)?);
        }
        ConfigAction::Reset => {
            forget_persisted_config(&settings).await?;
            println!("{} Saved export settings cleared", "✓".green().bold());
        }
        ConfigAction::Init => {
            let path = ensure_config_exists()?;
            println!("{} {}", "Config file:".bold(), path.display());
        }
    }

    Ok(())
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
