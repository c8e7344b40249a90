// src/services/listing.rs

//! Listing page fetcher.
//!
//! Retrieves one listing page and turns it into raw candidates using the
//! site's extraction profile. Failures never escape: a page that cannot be
//! fetched or parsed yields no candidates.

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Candidate, ExtractionConfig, RunContext, SiteConfig};
use crate::utils::http::fetch_text;
use crate::utils::{normalize_whitespace, resolve_url};

/// A source of listing pages, addressed by 1-based page number.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Candidates on `page`; empty when the page is missing or unreadable.
    async fn fetch_page(&self, page: u32) -> Vec<Candidate>;
}

/// Extracts candidates from listing page HTML.
#[derive(Debug, Clone)]
pub struct ListingParser {
    base_url: Url,
    extraction: ExtractionConfig,
    url_date: Regex,
}

impl ListingParser {
    /// Build a parser for `site`, checking its selectors and date pattern.
    pub fn new(site: &SiteConfig) -> Result<Self> {
        let extraction = site.extraction.clone();
        let selectors = [
            extraction.row_selector.as_deref(),
            Some(extraction.link_selector.as_str()),
            extraction.date_selector.as_deref(),
        ];
        for selector in selectors.into_iter().flatten() {
            parse_selector(selector)?;
        }

        let url_date = Regex::new(&extraction.url_date_pattern)
            .map_err(|e| AppError::config(format!("url_date_pattern: {e}")))?;

        Ok(Self {
            base_url: Url::parse(&site.base_url)?,
            extraction,
            url_date,
        })
    }

    /// Parse a listing page. Anchors without a recoverable date get `fallback`.
    pub fn parse(&self, html: &str, fallback: NaiveDate) -> Result<Vec<Candidate>> {
        let document = Html::parse_document(html);
        let link_sel = parse_selector(&self.extraction.link_selector)?;
        let date_sel = self
            .extraction
            .date_selector
            .as_deref()
            .map(parse_selector)
            .transpose()?;
        let fallback = fallback.format("%Y-%m-%d").to_string();

        let mut candidates = Vec::new();
        match self.extraction.row_selector.as_deref() {
            Some(row_selector) => {
                let row_sel = parse_selector(row_selector)?;
                for row in document.select(&row_sel) {
                    let Some(anchor) = row.select(&link_sel).next() else {
                        continue;
                    };
                    let Some((title, link)) = self.detail_link(anchor) else {
                        continue;
                    };
                    let raw_date_text = date_sel
                        .as_ref()
                        .and_then(|sel| element_text(row, sel))
                        .or_else(|| self.date_from_url(&link))
                        .unwrap_or_else(|| fallback.clone());
                    candidates.push(Candidate::new(title, link, raw_date_text));
                }
            }
            None => {
                for anchor in document.select(&link_sel) {
                    let Some((title, link)) = self.detail_link(anchor) else {
                        continue;
                    };
                    let raw_date_text = self
                        .date_from_url(&link)
                        .or_else(|| {
                            let sel = date_sel.as_ref()?;
                            let parent = anchor.parent().and_then(ElementRef::wrap)?;
                            element_text(parent, sel)
                        })
                        .unwrap_or_else(|| fallback.clone());
                    candidates.push(Candidate::new(title, link, raw_date_text));
                }
            }
        }
        Ok(candidates)
    }

    /// Title and absolute link of an anchor with the detail-page shape.
    fn detail_link(&self, anchor: ElementRef<'_>) -> Option<(String, String)> {
        let href = anchor.value().attr("href")?.trim();
        if !self.extraction.matches_href(href) {
            return None;
        }

        let mut title = normalize_whitespace(&anchor.text().collect::<String>());
        if title.is_empty() {
            title = normalize_whitespace(anchor.value().attr("title").unwrap_or(""));
        }
        Some((title, resolve_url(&self.base_url, href)))
    }

    fn date_from_url(&self, link: &str) -> Option<String> {
        self.url_date
            .captures(link)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn element_text(scope: ElementRef<'_>, sel: &Selector) -> Option<String> {
    let text = normalize_whitespace(&scope.select(sel).next()?.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

/// Fetches listing pages of one site over HTTP.
pub struct ListingFetcher {
    client: Client,
    site: SiteConfig,
    parser: ListingParser,
    fallback_date: NaiveDate,
}

impl ListingFetcher {
    /// Create a fetcher for one run.
    ///
    /// The run's base and start URLs take precedence over `site`; undated
    /// anchors are attributed to the run's target date.
    pub fn new(client: Client, mut site: SiteConfig, ctx: &RunContext) -> Result<Self> {
        site.base_url.clone_from(&ctx.base_url);
        site.start_url.clone_from(&ctx.start_url);
        let parser = ListingParser::new(&site)?;
        Ok(Self {
            client,
            site,
            parser,
            fallback_date: ctx.target_date,
        })
    }

    async fn try_fetch(&self, url: &str) -> Result<Vec<Candidate>> {
        let html = fetch_text(&self.client, url, &self.site.encoding).await?;
        self.parser.parse(&html, self.fallback_date)
    }
}

#[async_trait]
impl ListingSource for ListingFetcher {
    async fn fetch_page(&self, page: u32) -> Vec<Candidate> {
        let url = self.site.page_url(page.max(1));
        log::info!("Fetching page {}: {}", page, url);

        match self.try_fetch(&url).await {
            Ok(candidates) => {
                log::debug!("Page {} yielded {} candidates", page, candidates.len());
                candidates
            }
            Err(error) => {
                log::warn!("Failed to fetch listing page {} ({}): {}", page, url, error);
                Vec::new()
            }
        }
    }
}
