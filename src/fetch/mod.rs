// src/fetch/mod.rs

use anyhow::{Context, Result};
use reqwest::Client;
use std::future::Future;
use tracing::debug;
use url::Url;

use crate::config::Config;

pub mod cache;
pub mod urls;

pub use cache::FetchCache;
pub use urls::{country_links, profile_link, CountryLink};

/// Something that can turn a URL into a response body.
pub trait Fetch {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<String>> + Send;
}

/// Plain HTTP GET over a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Client with the configured per-request timeout and user agent.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(cfg.timeout())
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("building HTTP client")?;
        Ok(Self::new(client))
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String> {
        debug!("Fetching text from {}", url);
        self.client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Non-success status {}", url))?
            .text()
            .await
            .with_context(|| format!("Reading text from {}", url))
    }
}
