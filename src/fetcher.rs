use std::time::Duration;

use thiserror::Error;

use crate::{config::ScrapeConfig, types::RawPage};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    #[error("unexpected status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("could not build http client: {0}")]
    Client(String),
}

/// Seam between the batch runner and the network. Production code uses
/// [`HttpFetcher`]; tests substitute canned pages.
#[allow(async_fn_in_trait)]
pub trait FetchPage {
    async fn fetch_page(&self, identifier: &str) -> Result<RawPage, FetchError>;
}

/// Fetches product pages over HTTP. One attempt per call, bounded timeout,
/// no shared mutable state. Politeness delays between calls are the caller's
/// responsibility.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &ScrapeConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(HttpFetcher {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        })
    }

    pub fn product_url(&self, identifier: &str) -> String {
        format!(
            "{}/product/{}",
            self.base_url,
            urlencoding::encode(identifier)
        )
    }
}

impl FetchPage for HttpFetcher {
    async fn fetch_page(&self, identifier: &str) -> Result<RawPage, FetchError> {
        let url = self.product_url(identifier);
        debug!("fetching {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Http(e)
            }
        })?;

        Ok(RawPage {
            identifier: identifier.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}
