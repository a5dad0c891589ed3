//! Public IP detection.

use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use std::time::Duration;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of the caller's current public IP.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Fetch the current address as an opaque, trimmed string.
    async fn fetch_public_ip(&self) -> Result<String>;
}

/// Plain-text "what is my IP" endpoint.
#[derive(Debug)]
pub struct IpDetector {
    client: reqwest::Client,
    url: String,
}

impl IpDetector {
    /// Create a detector querying `url`.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, LOOKUP_TIMEOUT)
    }

    /// Create a detector whose requests give up after `timeout`.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// The endpoint being queried.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl IpSource for IpDetector {
    async fn fetch_public_ip(&self) -> Result<String> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(DdnsError::Network(format!(
                "HTTP {} from {}",
                response.status(),
                self.url
            )));
        }

        let text = response.text().await?;
        let ip = text.trim();

        if ip.is_empty() {
            return Err(DdnsError::Network(format!("empty response from {}", self.url)));
        }

        tracing::debug!(ip, url = %self.url, "Fetched public IP");
        Ok(ip.to_string())
    }
}
