// src/pipeline/run.rs

//! Run orchestration: fetch, filter, paginate, merge, format, notify.

use chrono::NaiveDate;

use crate::error::{AppError, Result};
use crate::models::{Config, NoNewPolicy, Notice, RunContext};
use crate::services::{DingTalkNotifier, EntryFilter, ListingFetcher, ListingSource, Notifier};
use crate::storage::LedgerStore;
use crate::utils::http;

use super::digest::{Digest, DigestFormatter};
use super::ledger::DedupLedger;
use super::paginate::Paginator;

/// What happened to the run's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyStatus {
    /// Delivered
    Sent,
    /// Delivery attempted and failed
    Failed,
    /// Nothing new and the policy is to stay silent
    Suppressed,
    /// Notification switched off for this run
    Disabled,
    /// No credentials available
    Unconfigured,
}

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub target_date: NaiveDate,
    /// Notices accepted across all fetched pages
    pub discovered: usize,
    /// Notices new to the ledger
    pub added: Vec<Notice>,
    /// Ledger size after the run
    pub ledger_len: usize,
    /// Whether the ledger was written
    pub persisted: bool,
    pub notification: NotifyStatus,
}

/// Wires the pipeline components into one execution.
pub struct Orchestrator<'a> {
    source: &'a dyn ListingSource,
    filter: &'a EntryFilter,
    store: &'a dyn LedgerStore,
    notifier: Option<&'a dyn Notifier>,
    formatter: DigestFormatter,
    no_new_policy: NoNewPolicy,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        source: &'a dyn ListingSource,
        filter: &'a EntryFilter,
        store: &'a dyn LedgerStore,
        formatter: DigestFormatter,
        no_new_policy: NoNewPolicy,
    ) -> Self {
        Self {
            source,
            filter,
            store,
            notifier: None,
            formatter,
            no_new_policy,
        }
    }

    pub fn with_notifier(mut self, notifier: &'a dyn Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Execute one run for `ctx.target_date`.
    pub async fn run(&self, ctx: &RunContext) -> RunReport {
        let date = ctx.target_date;
        let key = ctx.ledger_key();
        let ledger = DedupLedger::new(self.store);

        let existing = ledger.load(&key).await;
        let discovered = Paginator::new(self.source, self.filter).collect(ctx).await;

        if discovered.is_empty() {
            log::info!("No public bidding notices found for {}", date);
            let notification = self.deliver(ctx, self.formatter.nothing_found(date)).await;
            return RunReport {
                target_date: date,
                discovered: 0,
                added: Vec::new(),
                ledger_len: existing.len(),
                persisted: false,
                notification,
            };
        }

        log::info!("Found {} notices for {}", discovered.len(), date);
        let outcome = ledger.merge_and_persist(&key, &existing, &discovered).await;

        let notification = if outcome.has_new() {
            log::info!(
                "{} new notices; ledger now holds {}",
                outcome.added.len(),
                outcome.ledger.len()
            );
            self.deliver(ctx, self.formatter.digest(&outcome.ledger, date))
                .await
        } else {
            match self.no_new_policy {
                NoNewPolicy::Silent => {
                    log::info!("Nothing new since the last run; not notifying");
                    NotifyStatus::Suppressed
                }
                NoNewPolicy::Announce => {
                    self.deliver(ctx, self.formatter.no_new(date, outcome.ledger.len()))
                        .await
                }
            }
        };

        RunReport {
            target_date: date,
            discovered: discovered.len(),
            ledger_len: outcome.ledger.len(),
            persisted: outcome.persisted,
            added: outcome.added,
            notification,
        }
    }

    async fn deliver(&self, ctx: &RunContext, digest: Digest) -> NotifyStatus {
        if !ctx.notify_enabled {
            log::debug!("Notification disabled; not sending '{}'", digest.title);
            return NotifyStatus::Disabled;
        }
        let Some(notifier) = self.notifier else {
            log::info!("No webhook credentials configured; skipping notification");
            return NotifyStatus::Unconfigured;
        };

        match notifier.send_markdown(&digest.title, &digest.text).await {
            Ok(()) => NotifyStatus::Sent,
            Err(error) => {
                log::error!("Failed to send notification: {}", error);
                NotifyStatus::Failed
            }
        }
    }
}

/// Run the watcher against the configured site.
///
/// Fails only on configuration problems: a broken site profile, a zero page
/// bound, or missing credentials while notification is enabled and required.
pub async fn run_watch(
    config: &Config,
    ctx: &RunContext,
    store: &dyn LedgerStore,
) -> Result<RunReport> {
    if ctx.max_pages == 0 {
        return Err(AppError::validation("max_pages must be at least 1"));
    }

    let credentials = if ctx.notify_enabled {
        let credentials = config.notify.credentials();
        if credentials.is_none() && config.notify.required {
            return Err(AppError::config(format!(
                "notification requires {} and {} to be set",
                config.notify.token_env, config.notify.secret_env
            )));
        }
        credentials
    } else {
        None
    };

    let client = http::create_client(&config.crawler)?;
    let fetcher = ListingFetcher::new(client.clone(), config.site.clone(), ctx)?;
    let filter = EntryFilter::from_config(config);
    let notifier = credentials
        .map(|c| DingTalkNotifier::new(client, &config.notify.endpoint, c))
        .transpose()?;

    log::info!(
        "Watching {} for {} (up to {} pages)",
        config.site.name,
        ctx.target_date,
        ctx.max_pages
    );

    let mut orchestrator = Orchestrator::new(
        &fetcher,
        &filter,
        store,
        DigestFormatter::new(config.messages.clone()),
        config.notify.no_new_policy,
    );
    if let Some(notifier) = notifier.as_ref() {
        orchestrator = orchestrator.with_notifier(notifier);
    }

    Ok(orchestrator.run(ctx).await)
}
