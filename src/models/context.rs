//! Per-run execution context.

use std::time::Duration;

use chrono::NaiveDate;

use super::Config;

/// Immutable parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// The only publication date this run surfaces
    pub target_date: NaiveDate,

    /// Origin used to resolve relative links
    pub base_url: String,

    /// First listing page
    pub start_url: String,

    /// Upper bound on listing pages fetched
    pub max_pages: u32,

    /// Pages probed without a hit before giving up
    pub probe_pages: u32,

    /// Courtesy delay between page fetches
    pub page_delay: Duration,

    /// Whether messages are sent at all
    pub notify_enabled: bool,
}

impl RunContext {
    /// Build the context for `target_date` from configuration.
    pub fn new(config: &Config, target_date: NaiveDate) -> Self {
        Self {
            target_date,
            base_url: config.site.base_url.clone(),
            start_url: config.site.start_url.clone(),
            max_pages: config.crawler.max_pages,
            probe_pages: config.crawler.probe_pages,
            page_delay: Duration::from_millis(config.crawler.page_delay_ms),
            notify_enabled: config.notify.enabled,
        }
    }

    /// Storage key of this run's ledger.
    pub fn ledger_key(&self) -> String {
        self.target_date.format("%Y-%m-%d").to_string()
    }
}
