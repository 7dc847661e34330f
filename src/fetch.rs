//! One-shot page fetcher wrapping reqwest.
//!
//! A single bounded GET per request: browser User-Agent, redirects followed,
//! 10 s timeout, 5 MB cap. No retries — a failed fetch fails the request.

use std::time::Duration;
use thiserror::Error;

/// Browser identity sent with every fetch. Many origins serve stripped or
/// blocked pages to unknown agents.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Per-request fetch timeout.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum body size accepted, checked against Content-Length before the
/// body is downloaded.
pub const MAX_CONTENT_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Timeout - Source site is too slow.")]
    Timeout,
    #[error("content exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },
    #[error("{0}")]
    Request(String),
}

impl FetchError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Request(err.to_string())
        }
    }
}

/// A fetched page. Consumed once by the orchestrator, never persisted.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Response body decoded as text.
    pub body: String,
    /// HTTP status code.
    pub status: u16,
    /// Raw body length in bytes, before decoding.
    pub byte_len: usize,
    /// Response headers.
    pub headers: Vec<(String, String)>,
}

/// HTTP client for origin pages.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new() -> Self {
        // SECURITY TRADE-OFF: certificate verification is intentionally
        // disabled so origins with broken or self-signed TLS chains still
        // resolve. This client only reads public pages and sends no
        // credentials upstream.
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(BROWSER_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .danger_accept_invalid_certs(true)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Fetch a URL once. Timeouts, oversized bodies, and any network or
    /// HTTP-status failure are distinct error variants.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?
            .error_for_status()
            .map_err(FetchError::from_reqwest)?;

        if exceeds_cap(resp.content_length()) {
            return Err(FetchError::TooLarge {
                limit: MAX_CONTENT_BYTES,
            });
        }

        let status = resp.status().as_u16();
        let headers: Vec<(String, String)> = resp
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();

        let bytes = resp.bytes().await.map_err(FetchError::from_reqwest)?;
        Ok(FetchedPage {
            body: String::from_utf8_lossy(&bytes).into_owned(),
            status,
            byte_len: bytes.len(),
            headers,
        })
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether an advertised Content-Length is over the cap. A missing header
/// passes — the origin simply did not declare a length.
fn exceeds_cap(content_length: Option<u64>) -> bool {
    content_length.is_some_and(|len| len > MAX_CONTENT_BYTES)
}
