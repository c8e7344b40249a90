// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use encoding_rs::Encoding;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Create a configured asynchronous HTTP client.
pub fn create_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_str(&config.accept_language)
            .map_err(|e| AppError::config(format!("crawler.accept_language: {e}")))?,
    );

    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a page body and decode it as `encoding`, whatever the server declares.
///
/// Non-2xx responses are errors.
pub async fn fetch_text(client: &reqwest::Client, url: &str, encoding: &str) -> Result<String> {
    let response = client.get(url).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;
    decode_body(&bytes, encoding)
}

/// Decode `bytes` with the character set named by `label` (WHATWG labels).
pub fn decode_body(bytes: &[u8], label: &str) -> Result<String> {
    let encoding = Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| AppError::config(format!("unknown character set '{label}'")))?;
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        log::debug!("Body contained bytes invalid in {}", encoding.name());
    }
    Ok(text.into_owned())
}
