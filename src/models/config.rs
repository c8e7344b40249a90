//! Application configuration structures.

use std::fs;
use std::path::Path;

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Target site and how to read its listing pages
    #[serde(default)]
    pub site: SiteConfig,

    /// Category exclusion and navigation-label rules
    #[serde(default)]
    pub filter: FilterConfig,

    /// Webhook delivery settings
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Ledger persistence settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Message templates
    #[serde(default)]
    pub messages: MessageConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// UTC offset the target site publishes its dates in.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.crawler.utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }

    /// Today's date in the site's timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset()).date_naive()
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_pages == 0 {
            return Err(AppError::validation("crawler.max_pages must be > 0"));
        }
        if !(-23..=23).contains(&self.crawler.utc_offset_hours) {
            return Err(AppError::validation(
                "crawler.utc_offset_hours must be within -23..=23",
            ));
        }

        url::Url::parse(&self.site.base_url)
            .map_err(|e| AppError::validation(format!("site.base_url: {e}")))?;
        url::Url::parse(&self.site.start_url)
            .map_err(|e| AppError::validation(format!("site.start_url: {e}")))?;
        if !self.site.page_url_pattern.contains("{page}") {
            return Err(AppError::validation(
                "site.page_url_pattern must contain a {page} placeholder",
            ));
        }
        if encoding_rs::Encoding::for_label(self.site.encoding.trim().as_bytes()).is_none() {
            return Err(AppError::validation(format!(
                "site.encoding '{}' is not a known character set",
                self.site.encoding
            )));
        }
        if !self.site.section_prefix.starts_with('/') {
            return Err(AppError::validation(
                "site.section_prefix must be an absolute path",
            ));
        }
        self.site.extraction.validate()?;

        url::Url::parse(&self.notify.endpoint)
            .map_err(|e| AppError::validation(format!("notify.endpoint: {e}")))?;
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Accept-Language header for HTTP requests
    #[serde(default = "defaults::accept_language")]
    pub accept_language: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between listing page fetches in milliseconds
    #[serde(default = "defaults::page_delay")]
    pub page_delay_ms: u64,

    /// Upper bound on listing pages fetched per run
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,

    /// Pages probed without a hit before giving up on today
    #[serde(default = "defaults::probe_pages")]
    pub probe_pages: u32,

    /// Site timezone as hours east of UTC
    #[serde(default = "defaults::utc_offset_hours")]
    pub utc_offset_hours: i32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            accept_language: defaults::accept_language(),
            timeout_secs: defaults::timeout(),
            page_delay_ms: defaults::page_delay(),
            max_pages: defaults::max_pages(),
            probe_pages: defaults::probe_pages(),
            utc_offset_hours: defaults::utc_offset_hours(),
        }
    }
}

/// The listing site being watched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Display name used in logs
    #[serde(default = "defaults::site_name")]
    pub name: String,

    /// Origin used to resolve relative links
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// First listing page
    #[serde(default = "defaults::start_url")]
    pub start_url: String,

    /// Listing page URL for pages >= 2; `{page}` is replaced by the page number
    #[serde(default = "defaults::page_url_pattern")]
    pub page_url_pattern: String,

    /// Path prefix of the public bidding section
    #[serde(default = "defaults::section_prefix")]
    pub section_prefix: String,

    /// Character set used when the server does not declare one
    #[serde(default = "defaults::encoding")]
    pub encoding: String,

    #[serde(default)]
    pub extraction: ExtractionConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: defaults::site_name(),
            base_url: defaults::base_url(),
            start_url: defaults::start_url(),
            page_url_pattern: defaults::page_url_pattern(),
            section_prefix: defaults::section_prefix(),
            encoding: defaults::encoding(),
            extraction: ExtractionConfig::default(),
        }
    }
}

impl SiteConfig {
    /// URL of the given listing page (1-based).
    pub fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            self.start_url.clone()
        } else {
            self.page_url_pattern.replace("{page}", &page.to_string())
        }
    }
}

/// How candidate rows are located on a listing page.
///
/// Without `row_selector` every matching anchor in the document is a
/// candidate. With it, each row contributes its first matching anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Selector for each listing row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_selector: Option<String>,

    /// Selector for the detail link
    #[serde(default = "defaults::link_selector")]
    pub link_selector: String,

    /// Substrings the href must contain (all of them)
    #[serde(default = "defaults::href_contains")]
    pub href_contains: Vec<String>,

    /// Suffix the href must end with
    #[serde(default = "defaults::href_suffix")]
    pub href_suffix: Option<String>,

    /// Selector for a date element next to the link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_selector: Option<String>,

    /// Regex with one capture group extracting a date from the link
    #[serde(default = "defaults::url_date_pattern")]
    pub url_date_pattern: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            row_selector: None,
            link_selector: defaults::link_selector(),
            href_contains: defaults::href_contains(),
            href_suffix: defaults::href_suffix(),
            date_selector: None,
            url_date_pattern: defaults::url_date_pattern(),
        }
    }
}

impl ExtractionConfig {
    /// Whether an href has the detail-page shape.
    pub fn matches_href(&self, href: &str) -> bool {
        self.href_contains.iter().all(|part| href.contains(part.as_str()))
            && self
                .href_suffix
                .as_deref()
                .is_none_or(|suffix| href.ends_with(suffix))
    }

    fn validate(&self) -> Result<()> {
        let selectors = [
            self.row_selector.as_deref(),
            Some(self.link_selector.as_str()),
            self.date_selector.as_deref(),
        ];
        for selector in selectors.into_iter().flatten() {
            scraper::Selector::parse(selector)
                .map_err(|e| AppError::selector(selector, format!("{e:?}")))?;
        }

        let pattern = regex::Regex::new(&self.url_date_pattern).map_err(|e| {
            AppError::validation(format!("site.extraction.url_date_pattern: {e}"))
        })?;
        if pattern.captures_len() < 2 {
            return Err(AppError::validation(
                "site.extraction.url_date_pattern needs a capture group",
            ));
        }
        Ok(())
    }
}

/// Category exclusion and navigation-label rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Title keywords marking post-award or correction notices
    #[serde(default = "defaults::exclude_keywords")]
    pub exclude_keywords: Vec<String>,

    /// Pagination-control link texts
    #[serde(default = "defaults::nav_labels")]
    pub nav_labels: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            exclude_keywords: defaults::exclude_keywords(),
            nav_labels: defaults::nav_labels(),
        }
    }
}

/// What to send when a run finds notices but none are new.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoNewPolicy {
    /// Send nothing
    #[default]
    Silent,
    /// Send the fixed "no new notices" message
    Announce,
}

/// Webhook delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Send messages at all
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Treat missing credentials as a fatal error
    #[serde(default)]
    pub required: bool,

    /// Robot webhook endpoint
    #[serde(default = "defaults::endpoint")]
    pub endpoint: String,

    /// Environment variable holding the access token
    #[serde(default = "defaults::token_env")]
    pub token_env: String,

    /// Environment variable holding the signing secret
    #[serde(default = "defaults::secret_env")]
    pub secret_env: String,

    #[serde(default)]
    pub no_new_policy: NoNewPolicy,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            required: false,
            endpoint: defaults::endpoint(),
            token_env: defaults::token_env(),
            secret_env: defaults::secret_env(),
            no_new_policy: NoNewPolicy::default(),
        }
    }
}

/// Webhook credentials. Never read from the config file.
#[derive(Clone, PartialEq, Eq)]
pub struct NotifyCredentials {
    pub access_token: String,
    pub secret: String,
}

impl std::fmt::Debug for NotifyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyCredentials")
            .field("access_token", &"***")
            .field("secret", &"***")
            .finish()
    }
}

impl NotifyConfig {
    /// Read credentials from the process environment.
    pub fn credentials(&self) -> Option<NotifyCredentials> {
        self.credentials_with(|key| std::env::var(key).ok())
    }

    /// Read credentials through an arbitrary lookup; blank values count as missing.
    pub fn credentials_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Option<NotifyCredentials> {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Some(NotifyCredentials {
            access_token: non_blank(&self.token_env)?,
            secret: non_blank(&self.secret_env)?,
        })
    }
}

/// Ledger persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the per-day ledger files
    #[serde(default = "defaults::storage_dir")]
    pub dir: String,

    /// Ledger file name prefix; the date and `.json` follow
    #[serde(default = "defaults::file_prefix")]
    pub file_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: defaults::storage_dir(),
            file_prefix: defaults::file_prefix(),
        }
    }
}

/// Message templates.
///
/// Placeholders: `{date}` everywhere, `{count}` in `no_new`, and
/// `{index}`, `{title}`, `{link}`, `{publish_date}` in `digest_item`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageConfig {
    #[serde(default = "defaults::digest_title")]
    pub digest_title: String,
    #[serde(default = "defaults::digest_heading")]
    pub digest_heading: String,
    #[serde(default = "defaults::digest_item")]
    pub digest_item: String,
    #[serde(default = "defaults::empty_digest")]
    pub empty_digest: String,
    #[serde(default = "defaults::nothing_found_title")]
    pub nothing_found_title: String,
    #[serde(default = "defaults::nothing_found")]
    pub nothing_found: String,
    #[serde(default = "defaults::no_new_title")]
    pub no_new_title: String,
    #[serde(default = "defaults::no_new")]
    pub no_new: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            digest_title: defaults::digest_title(),
            digest_heading: defaults::digest_heading(),
            digest_item: defaults::digest_item(),
            empty_digest: defaults::empty_digest(),
            nothing_found_title: defaults::nothing_found_title(),
            nothing_found: defaults::nothing_found(),
            no_new_title: defaults::no_new_title(),
            no_new: defaults::no_new(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into()
    }
    pub fn accept_language() -> String {
        "zh-CN,zh;q=0.8,zh-TW;q=0.7,zh-HK;q=0.5,en-US;q=0.3,en;q=0.2".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn page_delay() -> u64 {
        2000
    }
    pub fn max_pages() -> u32 {
        10
    }
    pub fn probe_pages() -> u32 {
        3
    }
    pub fn utc_offset_hours() -> i32 {
        8
    }

    // Site defaults
    pub fn site_name() -> String {
        "甘肃省招标信息网".into()
    }
    pub fn base_url() -> String {
        "https://www.gsei.com.cn".into()
    }
    pub fn start_url() -> String {
        "https://www.gsei.com.cn/html/1336/".into()
    }
    pub fn page_url_pattern() -> String {
        "https://www.gsei.com.cn/html/1336/list-{page}.html".into()
    }
    pub fn section_prefix() -> String {
        "/html/1336/".into()
    }
    pub fn encoding() -> String {
        "utf-8".into()
    }

    // Extraction defaults
    pub fn link_selector() -> String {
        "a[href]".into()
    }
    pub fn href_contains() -> Vec<String> {
        vec!["content-".into()]
    }
    pub fn href_suffix() -> Option<String> {
        Some(".html".into())
    }
    pub fn url_date_pattern() -> String {
        r"/(\d{4}-\d{2}-\d{2})/".into()
    }

    // Filter defaults
    pub fn exclude_keywords() -> Vec<String> {
        ["结果", "中标", "流标", "废标", "更正", "变更", "补充", "答疑", "澄清", "延期"]
            .into_iter()
            .map(String::from)
            .collect()
    }
    pub fn nav_labels() -> Vec<String> {
        ["下一页", "上一页", "首页", "末页", "尾页", "...", "…"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    // Notify defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn endpoint() -> String {
        "https://oapi.dingtalk.com/robot/send".into()
    }
    pub fn token_env() -> String {
        "DD_ACCESS_TOKEN".into()
    }
    pub fn secret_env() -> String {
        "DD_SECRET".into()
    }

    // Storage defaults
    pub fn storage_dir() -> String {
        "storage".into()
    }
    pub fn file_prefix() -> String {
        "sent_links_".into()
    }

    // Message defaults
    pub fn digest_title() -> String {
        "{date} 公开招标信息更新".into()
    }
    pub fn digest_heading() -> String {
        "## {date} 公开招标信息更新\n\n".into()
    }
    pub fn digest_item() -> String {
        "### {index}. {title}\n- 原文链接：[点击查看]({link})\n- 发布日期：{publish_date}\n\n".into()
    }
    pub fn empty_digest() -> String {
        "## {date} 无新招标信息\n\n今日没有找到新的公开招标信息。".into()
    }
    pub fn nothing_found_title() -> String {
        "{date} 无新招标信息".into()
    }
    pub fn nothing_found() -> String {
        "## {date} 无新招标信息\n\n未找到今日的公开招标信息。".into()
    }
    pub fn no_new_title() -> String {
        "{date} 无新增招标信息".into()
    }
    pub fn no_new() -> String {
        "## {date} 无新增招标信息\n\n今日已推送 {count} 条公开招标信息，本次未发现新公告。".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
