//! Utility functions and helpers.

pub mod http;

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};
use url::Url;

static DATE_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})\s*[-/.年]\s*(\d{1,2})\s*[-/.月]\s*(\d{1,2})")
        .expect("date pattern is valid")
});

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern is valid"));

/// Substitute `{name}` placeholders in a single pass.
///
/// Substituted values are never rescanned; unknown placeholders are kept.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map_or_else(|| caps[0].to_string(), |(_, value)| value.to_string())
        })
        .into_owned()
}

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse the first calendar date found in free text.
///
/// Accepts `2026-10-19`, `2026/10/19`, `2026.10.19` and `2026年10月19日`,
/// optionally surrounded by other text such as brackets.
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let caps = DATE_TEXT.captures(text)?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://www.gsei.com.cn").unwrap();
        assert_eq!(
            resolve_url(&base, "/html/1336/2026-10-19/content-1.html"),
            "https://www.gsei.com.cn/html/1336/2026-10-19/content-1.html"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  某工程\n\t 公开招标  "), "某工程 公开招标");
        assert_eq!(normalize_whitespace(" \n "), "");
    }

    #[test]
    fn test_parse_date_text() {
        let expected = NaiveDate::from_ymd_opt(2026, 10, 19);
        assert_eq!(parse_date_text("2026-10-19"), expected);
        assert_eq!(parse_date_text("[2026/10/19]"), expected);
        assert_eq!(parse_date_text("2026年10月19日"), expected);
        assert_eq!(parse_date_text("发布时间：2026.10.19 09:00"), expected);
    }

    #[test]
    fn test_fill_template_is_single_pass() {
        let values = [("title", "标题{link}"), ("link", "https://a.example/1")];
        assert_eq!(
            fill_template("{title} -> {link} {unknown}", &values),
            "标题{link} -> https://a.example/1 {unknown}"
        );
    }

    #[test]
    fn test_parse_date_text_rejects_garbage() {
        assert_eq!(parse_date_text("昨天"), None);
        assert_eq!(parse_date_text(""), None);
        assert_eq!(parse_date_text("2026-13-40"), None);
    }
}
