use crate::domain::ports::PageSource;
use crate::utils::error::{EtlError, Result};
use crate::utils::text::decode_text;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "es-ES,es;q=0.9";

/// Match centre URL when only the id is known.
pub fn match_centre_url(base_url: &str, match_id: i64) -> String {
    format!(
        "{}/Matches/{}/Show/Match-Centre",
        base_url.trim_end_matches('/'),
        match_id
    )
}

pub fn live_url(base_url: &str, match_id: &str) -> String {
    format!("{}/Matches/{}/Live", base_url.trim_end_matches('/'), match_id)
}

/// Fetches pages over HTTP with browser-like headers. Clone it to share the
/// connection pool across a batch.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    pub fn new(user_agent: &str, accept_language: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        let lang = HeaderValue::from_str(accept_language).map_err(|e| {
            EtlError::InvalidConfigValueError {
                field: "fetch.accept_language".to_string(),
                value: accept_language.to_string(),
                reason: e.to_string(),
            }
        })?;
        headers.insert(ACCEPT_LANGUAGE, lang);

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Default for HttpPageSource {
    fn default() -> Self {
        Self::new(
            DEFAULT_USER_AGENT,
            DEFAULT_ACCEPT_LANGUAGE,
            Duration::from_secs(30),
        )
        .unwrap_or_else(|_| Self {
            client: Client::new(),
        })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &str) -> Result<String> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        tracing::debug!("{} answered {}", url, status);

        if !status.is_success() {
            return Err(EtlError::HttpStatusError {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        Ok(decode_text(&bytes))
    }
}

/// Reads saved pages from disk. Locations are file paths, relative to `root` if set.
#[derive(Debug, Clone, Default)]
pub struct FilePageSource {
    root: Option<PathBuf>,
}

impl FilePageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

#[async_trait]
impl PageSource for FilePageSource {
    async fn fetch(&self, location: &str) -> Result<String> {
        let path = match &self.root {
            Some(root) => root.join(location),
            None => PathBuf::from(location),
        };
        let bytes = tokio::fs::read(&path).await?;
        tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());
        Ok(decode_text(&bytes))
    }
}

/// Wraps another source and retries failed fetches, sleeping
/// `backoff_secs^attempt` seconds before each retry.
#[derive(Debug, Clone)]
pub struct RetryPageSource<P> {
    inner: P,
    attempts: u32,
    backoff_secs: f64,
}

impl<P: PageSource> RetryPageSource<P> {
    pub fn new(inner: P, attempts: u32, backoff_secs: f64) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            backoff_secs: backoff_secs.max(0.0),
        }
    }

    /// Sleep before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        Duration::from_secs_f64(self.backoff_secs.powi(exp))
    }
}

#[async_trait]
impl<P: PageSource> PageSource for RetryPageSource<P> {
    async fn fetch(&self, url: &str) -> Result<String> {
        let mut attempt = 1;
        loop {
            match self.inner.fetch(url).await {
                Ok(html) => return Ok(html),
                Err(e) if attempt < self.attempts => {
                    let wait = self.delay(attempt);
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}; retrying in {:.1}s",
                        attempt,
                        self.attempts,
                        url,
                        e,
                        wait.as_secs_f64()
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
