//! Digest formatting.
//!
//! The digest always lists the whole ledger for the day, not only the
//! notices added by the current run.

use chrono::NaiveDate;

use crate::models::{MessageConfig, Notice};
use crate::utils::fill_template;

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub title: String,
    pub text: String,
}

/// Renders ledgers and status messages from templates.
#[derive(Debug, Clone, Default)]
pub struct DigestFormatter {
    messages: MessageConfig,
}

impl DigestFormatter {
    pub fn new(messages: MessageConfig) -> Self {
        Self { messages }
    }

    /// Markdown body for `ledger`: a heading and a 1-based numbered list in ledger order.
    pub fn format(&self, ledger: &[Notice], date: NaiveDate) -> String {
        let date = date.to_string();
        if ledger.is_empty() {
            return self.messages.empty_digest.replace("{date}", &date);
        }

        let mut text = self.messages.digest_heading.replace("{date}", &date);
        for (i, notice) in ledger.iter().enumerate() {
            let index = (i + 1).to_string();
            let item = fill_template(&self.messages.digest_item, &[("index", index.as_str())]);
            text.push_str(&notice.format(&item));
        }
        text
    }

    /// Title and body for `ledger`.
    pub fn digest(&self, ledger: &[Notice], date: NaiveDate) -> Digest {
        let title = if ledger.is_empty() {
            &self.messages.nothing_found_title
        } else {
            &self.messages.digest_title
        };
        Digest {
            title: title.replace("{date}", &date.to_string()),
            text: self.format(ledger, date),
        }
    }

    /// Message for a run that discovered no notices at all.
    pub fn nothing_found(&self, date: NaiveDate) -> Digest {
        let date = date.to_string();
        Digest {
            title: self.messages.nothing_found_title.replace("{date}", &date),
            text: self.messages.nothing_found.replace("{date}", &date),
        }
    }

    /// Message for a run whose notices were all already in the ledger.
    pub fn no_new(&self, date: NaiveDate, ledger_len: usize) -> Digest {
        let date = date.to_string();
        Digest {
            title: self.messages.no_new_title.replace("{date}", &date),
            text: self
                .messages
                .no_new
                .replace("{date}", &date)
                .replace("{count}", &ledger_len.to_string()),
        }
    }
}
