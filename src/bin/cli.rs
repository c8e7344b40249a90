//! bidwatch CLI
//!
//! Local execution entry point, meant to be run on a schedule.

use std::path::PathBuf;

use bidwatch::{
    error::Result,
    models::{Config, RunContext},
    pipeline::{self, DedupLedger, DigestFormatter, NotifyStatus},
    services::ListingParser,
    storage::LocalStorage,
};
use chrono::{Days, NaiveDate};
use clap::{Parser, Subcommand};

/// bidwatch - Procurement Notice Watcher
#[derive(Parser, Debug)]
#[command(
    name = "bidwatch",
    version,
    about = "Watches a procurement listing for today's tender notices"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "storage/config.toml")]
    config: PathBuf,

    /// Directory holding daily ledgers (overrides storage.dir)
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch today's notices, update the ledger and send the digest
    Run {
        /// Target date in YYYY-MM-DD (default: today in the site's timezone)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Override crawler.max_pages
        #[arg(long)]
        max_pages: Option<u32>,

        /// Skip notification for this run
        #[arg(long)]
        no_notify: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Show the ledger for a day and preview its digest
    Info {
        /// Day to show in YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Delete ledgers older than the retention window
    Prune {
        /// Delete ledgers dated more than this many days ago
        #[arg(long, default_value_t = 7)]
        keep_days: u64,
    },
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config);
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(cli.verbose, &level);

    log::info!("bidwatch starting...");

    let mut config = match loaded {
        Ok(config) => {
            log::info!("Loaded configuration from {}", cli.config.display());
            config
        }
        Err(e) => {
            log::warn!(
                "Config load failed from {}: {}. Using defaults.",
                cli.config.display(),
                e
            );
            Config::default()
        }
    };

    let storage = match &cli.storage_dir {
        Some(dir) => LocalStorage::with_prefix(dir, config.storage.file_prefix.clone()),
        None => LocalStorage::from_config(&config.storage),
    };

    match cli.command {
        Command::Run {
            date,
            max_pages,
            no_notify,
        } => {
            if let Some(max_pages) = max_pages {
                config.crawler.max_pages = max_pages;
            }
            if no_notify {
                config.notify.enabled = false;
            }
            config.validate()?;

            let ctx = RunContext::new(&config, date.unwrap_or_else(|| config.today()));

            let report = pipeline::run_watch(&config, &ctx, &storage).await?;

            log::info!(
                "{}: {} discovered, {} new, {} in ledger",
                report.target_date,
                report.discovered,
                report.added.len(),
                report.ledger_len
            );
            for notice in &report.added {
                log::info!("  + {} ({})", notice.title, notice.link);
            }
            if !report.added.is_empty() && !report.persisted {
                log::warn!("Ledger was not saved; these notices will be reported again");
            }
            match report.notification {
                NotifyStatus::Sent => log::info!("Notification sent"),
                NotifyStatus::Failed => log::warn!("Notification failed"),
                NotifyStatus::Suppressed => log::info!("Nothing new, notification skipped"),
                NotifyStatus::Disabled => log::info!("Notification disabled"),
                NotifyStatus::Unconfigured => log::warn!(
                    "Notification skipped: {} / {} not set",
                    config.notify.token_env,
                    config.notify.secret_env
                ),
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            ListingParser::new(&config.site)?;
            log::info!("✓ Config OK ({})", config.site.name);

            if config.notify.credentials().is_some() {
                log::info!("✓ Notification credentials present");
            } else if config.notify.enabled {
                log::warn!(
                    "Notification credentials missing: set {} and {}",
                    config.notify.token_env,
                    config.notify.secret_env
                );
            }

            log::info!("All validations passed!");
        }

        Command::Info { date } => {
            let date = date.unwrap_or_else(|| config.today());
            let ctx = RunContext::new(&config, date);

            log::info!("Site: {} ({})", config.site.name, config.site.start_url);
            log::info!("Storage directory: {}", storage.root_dir().display());

            let ledger = DedupLedger::new(&storage).load(&ctx.ledger_key()).await;
            log::info!("{} notices recorded for {}", ledger.len(), date);

            let digest = DigestFormatter::new(config.messages.clone()).digest(&ledger, date);
            println!("{}\n\n{}", digest.title, digest.text);
        }

        Command::Prune { keep_days } => {
            let today = config.today();
            let cutoff = today
                .checked_sub_days(Days::new(keep_days))
                .unwrap_or(NaiveDate::MIN);

            let removed = DedupLedger::new(&storage).prune(cutoff).await?;
            log::info!(
                "Removed {} ledgers older than {}",
                removed.len(),
                cutoff
            );
        }
    }

    log::info!("Done!");

    Ok(())
}
