use std::time::Duration;

use anyhow::{Result, anyhow};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, Proxy};
use tracing::debug;

use crate::error::FetchError;

/// The source rejects non-browser user agents.
pub const FETCH_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Plain `fetch(url) -> html` capability used by the static strategy.
pub trait PageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// `reqwest`-backed fetcher with a browser-like request profile.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: Option<&str>, proxy: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.unwrap_or(FETCH_USER_AGENT));

        if let Some(proxy_url) = proxy {
            let proxy = Proxy::all(proxy_url)
                .map_err(|e| anyhow!("Invalid proxy URL '{}': {}", proxy_url, e))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!("Fetching: {}", url);

        let response = self
            .client
            .get(url)
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(ACCEPT_LANGUAGE, "zh-HK,zh;q=0.9,en;q=0.8")
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        debug!("Fetched {} bytes", body.len());
        Ok(body)
    }
}
