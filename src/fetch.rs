//! HTTP transport for council pages and minutes documents.
//!
//! Pipelines never call `reqwest` directly. They go through the
//! [`PageFetcher`] trait so that a crawl can be driven by the real
//! [`HttpFetcher`] or, in tests, by an in-memory site.

use crate::config::HttpConfig;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::error::Error;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use url::Url;

/// Something that can GET a URL.
///
/// Implementations must treat a non-success HTTP status as an error so that
/// callers can stop a crawl on the first failed page.
pub trait PageFetcher {
    /// Fetch a page and return its body as text.
    async fn fetch_text(&self, url: &Url) -> Result<String, Box<dyn Error>>;

    /// Fetch a resource and return its raw body.
    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, Box<dyn Error>>;
}

/// [`PageFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client with the configured timeout and user agent.
    pub fn new(config: &HttpConfig) -> Result<Self, Box<dyn Error>> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/pdf;q=0.9,*/*;q=0.8"),
        );
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        debug!(%url, %status, elapsed_ms = t0.elapsed().as_millis() as u64, "GET");
        if !status.is_success() {
            warn!(%url, %status, "Non-success HTTP status");
            return Err(format!("HTTP error! status: {}", status).into());
        }
        Ok(resp)
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch_text(&self, url: &Url) -> Result<String, Box<dyn Error>> {
        Ok(self.get(url).await?.text().await?)
    }

    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, Box<dyn Error>> {
        Ok(self.get(url).await?.bytes().await?.to_vec())
    }
}
