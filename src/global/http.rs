// src/global/http.rs
use std::time::Duration;
use reqwest::Client;
use tracing::{debug, warn};

use crate::global::config::HttpConfig;
use crate::global::error::HttpError;

/// Source of page bodies for the scraping side.
/// The HTTP client implements it; tests swap in canned pages.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, HttpError>;
}

/// Holds the two HTTP clients the tool needs
#[derive(Clone)]
pub struct HttpClientManager {
    pages: Client,
    downloads: Client,
}

impl HttpClientManager {
    pub fn new(config: &HttpConfig) -> Result<Self, HttpError> {
        // Page fetches keep the library default unless a timeout is configured
        let mut pages = Client::builder().user_agent(config.user_agent.as_str());
        if let Some(seconds) = config.page_timeout_seconds {
            pages = pages.timeout(Duration::from_secs(seconds));
        }
        let pages = pages.build().map_err(HttpError::ClientBuild)?;

        let downloads = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.download_timeout_seconds))
            .build()
            .map_err(HttpError::ClientBuild)?;

        Ok(Self { pages, downloads })
    }

    /// Client used for streaming image downloads (fixed timeout)
    pub fn downloads(&self) -> &Client {
        &self.downloads
    }
}

#[async_trait::async_trait]
impl PageSource for HttpClientManager {
    async fn fetch_page(&self, url: &str) -> Result<String, HttpError> {
        debug!(url = %url, "Fetching page");

        let response = self
            .pages
            .get(url)
            .send()
            .await
            .map_err(|source| HttpError::RequestFailed {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Unexpected page status");
            return Err(HttpError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| HttpError::BodyUnreadable {
            url: url.to_string(),
            source,
        })
    }
}
