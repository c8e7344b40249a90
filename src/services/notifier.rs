// src/services/notifier.rs

//! DingTalk robot notifier.
//!
//! Messages are signed per request: the signature covers the millisecond
//! timestamp of the send, so the timestamp is an explicit argument.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::NotifyCredentials;

type HmacSha256 = Hmac<Sha256>;

/// Destination for rendered markdown messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one markdown message.
    async fn send_markdown(&self, title: &str, text: &str) -> Result<()>;
}

/// Compute the robot signature for `timestamp_ms`.
///
/// `base64(HMAC-SHA256(key = secret, message = "{timestamp}\n{secret}"))`,
/// not yet percent-encoded.
pub fn sign(secret: &str, timestamp_ms: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(format!("{timestamp_ms}\n{secret}").as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

#[derive(Debug, Serialize)]
struct MarkdownMessage<'a> {
    msgtype: &'static str,
    markdown: MarkdownBody<'a>,
}

#[derive(Debug, Serialize)]
struct MarkdownBody<'a> {
    title: &'a str,
    text: &'a str,
}

/// Reply body of the robot API.
#[derive(Debug, Deserialize)]
struct RobotReply {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// Interpret a 2xx reply body; a non-zero `errcode` is a rejection.
fn check_reply(body: &str) -> Result<()> {
    match serde_json::from_str::<RobotReply>(body) {
        Ok(reply) if reply.errcode != 0 => Err(AppError::notify(reply.errcode, reply.errmsg)),
        _ => Ok(()),
    }
}

/// Signed-webhook client for a DingTalk custom robot.
pub struct DingTalkNotifier {
    client: Client,
    endpoint: Url,
    credentials: NotifyCredentials,
}

impl DingTalkNotifier {
    pub fn new(client: Client, endpoint: &str, credentials: NotifyCredentials) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: Url::parse(endpoint)?,
            credentials,
        })
    }

    /// Endpoint with `access_token`, `timestamp` and percent-encoded `sign`.
    pub fn signed_url(&self, timestamp_ms: i64) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("access_token", &self.credentials.access_token)
            .append_pair("timestamp", &timestamp_ms.to_string())
            .append_pair("sign", &sign(&self.credentials.secret, timestamp_ms));
        url
    }

    /// Send a message signed for `timestamp_ms`.
    pub async fn send_at(&self, title: &str, text: &str, timestamp_ms: i64) -> Result<()> {
        let payload = MarkdownMessage {
            msgtype: "markdown",
            markdown: MarkdownBody { title, text },
        };

        let body = self
            .client
            .post(self.signed_url(timestamp_ms))
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        check_reply(&body)?;

        log::info!("Notification delivered: {}", title);
        Ok(())
    }
}

#[async_trait]
impl Notifier for DingTalkNotifier {
    async fn send_markdown(&self, title: &str, text: &str) -> Result<()> {
        self.send_at(title, text, Utc::now().timestamp_millis()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{http_response, serve_once};

    fn notifier() -> DingTalkNotifier {
        DingTalkNotifier::new(
            Client::new(),
            "https://oapi.dingtalk.com/robot/send",
            NotifyCredentials {
                access_token: "abc123".into(),
                secret: "SEC0123456789".into(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_sign_is_deterministic_per_timestamp() {
        let a = sign("SEC0123456789", 1_760_000_000_000);
        let b = sign("SEC0123456789", 1_760_000_000_000);
        let c = sign("SEC0123456789", 1_760_000_000_001);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, sign("SEC-other", 1_760_000_000_000));
    }

    #[test]
    fn test_sign_is_base64_of_sha256_mac() {
        let signature = sign("SEC0123456789", 1_760_000_000_000);
        let raw = STANDARD.decode(&signature).unwrap();
        assert_eq!(raw.len(), 32);

        let mut mac = HmacSha256::new_from_slice(b"SEC0123456789").unwrap();
        mac.update(b"1760000000000\nSEC0123456789");
        mac.verify_slice(&raw).unwrap();
    }

    #[test]
    fn test_signed_url_carries_encoded_query() {
        let ts = 1_760_000_000_000;
        let url = notifier().signed_url(ts);

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs[0], ("access_token".into(), "abc123".into()));
        assert_eq!(pairs[1], ("timestamp".into(), ts.to_string()));
        assert_eq!(pairs[2], ("sign".into(), sign("SEC0123456789", ts)));

        let query = url.query().unwrap();
        let raw_sign = query.rsplit("sign=").next().unwrap();
        assert!(!raw_sign.contains('+'));
        assert!(!raw_sign.contains('/'));
        assert!(!raw_sign.contains('='));
    }

    #[test]
    fn test_payload_shape() {
        let payload = MarkdownMessage {
            msgtype: "markdown",
            markdown: MarkdownBody {
                title: "2026-10-19 公开招标信息更新",
                text: "## 标题",
            },
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(
            json,
            r###"{"msgtype":"markdown","markdown":{"title":"2026-10-19 公开招标信息更新","text":"## 标题"}}"###
        );
    }

    #[test]
    fn test_check_reply() {
        assert!(check_reply(r#"{"errcode":0,"errmsg":"ok"}"#).is_ok());
        assert!(check_reply("").is_ok());
        assert!(matches!(
            check_reply(r#"{"errcode":310000,"errmsg":"sign not match"}"#),
            Err(AppError::Notify { code: 310000, .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let notifier = DingTalkNotifier::new(
            Client::new(),
            "http://127.0.0.1:9/robot/send",
            NotifyCredentials {
                access_token: "t".into(),
                secret: "s".into(),
            },
        )
        .unwrap();
        assert!(notifier.send_markdown("t", "x").await.is_err());
    }

    fn local_notifier(url: &str) -> DingTalkNotifier {
        DingTalkNotifier::new(
            Client::new(),
            &format!("{url}robot/send"),
            NotifyCredentials {
                access_token: "abc123".into(),
                secret: "SEC0123456789".into(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_server_error_is_a_failure() {
        let response = http_response(
            "500 Internal Server Error",
            "application/json",
            br#"{"errcode":0,"errmsg":"ok"}"#,
        );
        let (url, request) = serve_once(response).await;

        let ts = 1_760_000_000_000;
        let result = local_notifier(&url).send_at("标题", "正文", ts).await;
        assert!(matches!(result, Err(AppError::Http(_))));

        let request = request.await.unwrap();
        let request_line = request.lines().next().unwrap();
        let expected = local_notifier(&url).signed_url(ts);
        assert_eq!(
            request_line,
            format!("POST {}?{} HTTP/1.1", expected.path(), expected.query().unwrap())
        );
        assert!(request_line.contains(&format!("timestamp={ts}")));
        assert!(request_line.contains("sign="));
        assert!(request.ends_with(
            r#"{"msgtype":"markdown","markdown":{"title":"标题","text":"正文"}}"#
        ));
    }

    #[tokio::test]
    async fn test_rejected_reply_is_a_failure() {
        let body = br#"{"errcode":310000,"errmsg":"sign not match"}"#;
        let (url, _) = serve_once(http_response("200 OK", "application/json", body)).await;

        let result = local_notifier(&url).send_at("标题", "正文", 1_760_000_000_000).await;
        assert!(matches!(result, Err(AppError::Notify { code: 310000, .. })));
    }
}
