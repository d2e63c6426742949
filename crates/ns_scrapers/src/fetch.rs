use std::time::Duration;

use async_trait::async_trait;
use ns_core::{Error, Result};
use reqwest::Client;
use tracing::debug;

use crate::config::ScrapeConfig;

/// Retrieves raw page markup. One attempt per call, no retries.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &ScrapeConfig) -> Result<Self> {
        Self::new(config.timeout(), &config.user_agent)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await.map_err(|e| Error::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch {
                url: url.to_string(),
                reason: format!("unexpected status {}", status),
            });
        }

        let body = response.text().await?;
        debug!(%url, bytes = body.len(), "Fetched page");
        Ok(body)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Serves canned pages keyed by URL and records every request.
    #[derive(Default)]
    pub struct StaticFetcher {
        pages: HashMap<String, String>,
        pub requests: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }

        pub fn request_count(&self, url: &str) -> usize {
            self.requests.lock().unwrap().iter().filter(|u| u.as_str() == url).count()
        }
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned().ok_or_else(|| Error::Fetch {
                url: url.to_string(),
                reason: "unexpected status 404 Not Found".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_static_fetcher_missing_page_is_fetch_error() {
        let fetcher = StaticFetcher::new().with_page("https://example.com/", "<html></html>");
        assert!(fetcher.fetch("https://example.com/").await.is_ok());
        let missing = fetcher.fetch("https://example.com/missing").await;
        assert!(matches!(missing, Err(Error::Fetch { .. })));
        assert_eq!(fetcher.request_count("https://example.com/missing"), 1);
    }
}
