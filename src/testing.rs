//! Shared fixtures and fakes for unit tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::error::{AppError, Result};
use crate::models::{Candidate, Config, Notice, RunContext};
use crate::services::{ListingSource, Notifier};

pub fn target_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

/// Run context for 2026-10-19 with no page delay.
pub fn run_context() -> RunContext {
    let mut ctx = RunContext::new(&Config::default(), target_date());
    ctx.page_delay = Duration::ZERO;
    ctx
}

pub fn notice(id: u32) -> Notice {
    Notice {
        title: format!("第{id}号工程公开招标公告"),
        link: format!("https://www.gsei.com.cn/html/1336/2026-10-19/content-{id}.html"),
        publish_date: target_date(),
        discovered_at: DateTime::parse_from_rfc3339("2026-10-19T09:00:00+08:00").unwrap(),
    }
}

/// A candidate dated 2026-10-19 inside the default bidding section.
pub fn today_candidate(id: u32, title: &str) -> Candidate {
    Candidate::new(
        title,
        format!("https://www.gsei.com.cn/html/1336/2026-10-19/content-{id}.html"),
        "2026-10-19",
    )
}

/// Listing source serving fixed pages; pages past the end are empty.
pub struct ScriptedSource {
    pages: Vec<Vec<Candidate>>,
    calls: Mutex<Vec<u32>>,
}

impl ScriptedSource {
    pub fn new(pages: Vec<Vec<Candidate>>) -> Self {
        Self {
            pages,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Page numbers requested so far.
    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingSource for ScriptedSource {
    async fn fetch_page(&self, page: u32) -> Vec<Candidate> {
        self.calls.lock().unwrap().push(page);
        self.pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_default()
    }
}

/// Notifier that records messages instead of sending them.
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A notifier whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_markdown(&self, title: &str, text: &str) -> Result<()> {
        if self.fail {
            return Err(AppError::notify(310000, "sign not match"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), text.to_string()));
        Ok(())
    }
}

/// Raw HTTP/1.1 response with a fixed body.
pub fn http_response(status: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\
         Connection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}

/// Answer one connection on a local port with `response`.
///
/// Returns the server's base URL and a handle yielding the raw request.
pub async fn serve_once(response: Vec<u8>) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        socket.write_all(&response).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });

    (format!("http://{addr}/"), handle)
}

/// Read a request head and its `Content-Length` body.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];

    let head_end = loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            return String::from_utf8_lossy(&request).into_owned();
        }
        request.extend_from_slice(&buf[..n]);
        if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&request[..head_end]).to_lowercase();
    let body_len = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while request.len() < head_end + body_len {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
    }
    String::from_utf8_lossy(&request).into_owned()
}
