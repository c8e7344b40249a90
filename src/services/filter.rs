// src/services/filter.rs

//! Entry filter.
//!
//! Decides which candidates are same-day public bidding notices. Rules run
//! in a fixed order: date scope, category exclusion, section prefix, then
//! navigation artifacts.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use url::Url;

use crate::models::{Candidate, Config, FilterConfig, Notice, SiteConfig};
use crate::utils::parse_date_text;

/// Characters stripped before comparing a title against navigation labels.
const ARROW_CHARS: &[char] = &['<', '>', '«', '»', '‹', '›', '《', '》'];

/// Why a candidate was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Published on another day
    WrongDate(NaiveDate),
    /// Title carries a post-award or correction keyword
    Excluded(String),
    /// Link lies outside the public bidding section
    OutsideSection,
    /// Empty title or a pagination control
    Navigation,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::WrongDate(date) => write!(f, "published on {date}"),
            Rejection::Excluded(keyword) => write!(f, "excluded keyword '{keyword}'"),
            Rejection::OutsideSection => write!(f, "outside section"),
            Rejection::Navigation => write!(f, "navigation link"),
        }
    }
}

/// Date-scope and category filter for listing candidates.
#[derive(Debug, Clone)]
pub struct EntryFilter {
    exclude_keywords: Vec<String>,
    nav_labels: Vec<String>,
    section_prefix: String,
    offset: FixedOffset,
}

impl EntryFilter {
    pub fn new(filter: &FilterConfig, site: &SiteConfig, offset: FixedOffset) -> Self {
        Self {
            exclude_keywords: filter.exclude_keywords.clone(),
            nav_labels: filter.nav_labels.clone(),
            section_prefix: site.section_prefix.clone(),
            offset,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.filter, &config.site, config.offset())
    }

    /// Accept `candidate` for `target_date`, stamping the current time.
    pub fn accept(&self, candidate: &Candidate, target_date: NaiveDate) -> Option<Notice> {
        let now = Utc::now().with_timezone(&self.offset);
        self.evaluate(candidate, target_date, now).ok()
    }

    /// Accept every passing candidate, in input order.
    pub fn accept_all(&self, candidates: &[Candidate], target_date: NaiveDate) -> Vec<Notice> {
        let now = Utc::now().with_timezone(&self.offset);
        candidates
            .iter()
            .filter_map(|candidate| match self.evaluate(candidate, target_date, now) {
                Ok(notice) => Some(notice),
                Err(reason) => {
                    log::debug!(
                        "Skipped '{}' ({}): {}",
                        candidate.title,
                        candidate.link,
                        reason
                    );
                    None
                }
            })
            .collect()
    }

    /// Apply all rules, returning the first failing one.
    pub fn evaluate(
        &self,
        candidate: &Candidate,
        target_date: NaiveDate,
        discovered_at: DateTime<FixedOffset>,
    ) -> Result<Notice, Rejection> {
        let publish_date = parse_date_text(&candidate.raw_date_text).unwrap_or(target_date);
        if publish_date != target_date {
            return Err(Rejection::WrongDate(publish_date));
        }

        if let Some(keyword) = self
            .exclude_keywords
            .iter()
            .find(|k| !k.is_empty() && candidate.title.contains(k.as_str()))
        {
            return Err(Rejection::Excluded(keyword.clone()));
        }

        if !self.in_section(&candidate.link) {
            return Err(Rejection::OutsideSection);
        }

        if self.is_navigation(&candidate.title) {
            return Err(Rejection::Navigation);
        }

        Ok(Notice {
            title: candidate.title.trim().to_string(),
            link: candidate.link.clone(),
            publish_date,
            discovered_at,
        })
    }

    fn in_section(&self, link: &str) -> bool {
        Url::parse(link)
            .map(|url| url.path().starts_with(&self.section_prefix))
            .unwrap_or(false)
    }

    fn is_navigation(&self, title: &str) -> bool {
        let bare = title
            .trim()
            .trim_matches(|c: char| c.is_whitespace() || ARROW_CHARS.contains(&c));
        bare.is_empty() || self.nav_labels.iter().any(|label| label == bare)
    }
}
