//! Notice data structures.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::utils::fill_template;

/// A raw listing row scraped from one page, before any filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Anchor text, whitespace-normalized
    pub title: String,

    /// Absolute URL of the detail page
    pub link: String,

    /// Date text as found on the page or in the URL
    pub raw_date_text: String,
}

impl Candidate {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        raw_date_text: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            raw_date_text: raw_date_text.into(),
        }
    }
}

/// A notice that passed the date-scope and category filters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    /// Notice title
    pub title: String,

    /// Full URL to the notice; unique within a ledger
    pub link: String,

    /// Publication date of the notice
    pub publish_date: NaiveDate,

    /// When this run first saw the notice
    pub discovered_at: DateTime<FixedOffset>,
}

impl Notice {
    /// Format notice for display using a template.
    ///
    /// Supported placeholders:
    /// - `{title}`, `{link}`, `{publish_date}`, `{discovered_at}`
    pub fn format(&self, template: &str) -> String {
        let publish_date = self.publish_date.to_string();
        let discovered_at = self.discovered_at.format("%Y-%m-%d %H:%M:%S").to_string();
        fill_template(
            template,
            &[
                ("title", self.title.as_str()),
                ("link", self.link.as_str()),
                ("publish_date", publish_date.as_str()),
                ("discovered_at", discovered_at.as_str()),
            ],
        )
    }
}
