//! Cloudflare API v4 client.

use super::{DnsApi, DnsRecord, RecordUpdate};
use crate::config::Config;
use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);
const UPDATE_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_SIZE: u32 = 100;

/// Cloudflare client bound to one account and zone.
pub struct CloudflareClient {
    client: reqwest::Client,
    email: String,
    api_token: String,
    zone_id: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CloudflareResponse<T> {
    success: bool,
    result: Option<T>,
    #[serde(default)]
    errors: Vec<CloudflareError>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct CloudflareError {
    #[serde(default)]
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
}

impl CloudflareClient {
    /// Create a client from the configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base_url(
            config.email.clone(),
            config.token.clone(),
            config.zone_id.clone(),
            config.api_url.clone(),
        )
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(
        email: String,
        api_token: String,
        zone_id: String,
        base_url: String,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(UPDATE_TIMEOUT).build()?;

        Ok(Self {
            client,
            email,
            api_token,
            zone_id,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.zone_id)
    }

    /// Send an authenticated request and unwrap the response envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<CloudflareResponse<T>> {
        let response = request
            .header("X-Auth-Email", &self.email)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<CloudflareResponse<serde_json::Value>>(&body)
                .ok()
                .filter(|r| !r.errors.is_empty())
                .map(|r| describe(&r.errors))
                .unwrap_or_else(|| excerpt(&body));
            return Err(DdnsError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: CloudflareResponse<T> = serde_json::from_str(&body)
            .map_err(|e| DdnsError::Api(format!("malformed response: {}", e)))?;

        if !envelope.success {
            return Err(DdnsError::Api(describe(&envelope.errors)));
        }

        Ok(envelope)
    }
}

#[async_trait]
impl DnsApi for CloudflareClient {
    async fn verify_auth(&self) -> Result<()> {
        let request = self
            .client
            .get(format!("{}/user", self.base_url))
            .timeout(LOOKUP_TIMEOUT);

        self.send::<serde_json::Value>(request).await?;
        Ok(())
    }

    async fn list_records(&self) -> Result<Vec<DnsRecord>> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let request = self
                .client
                .get(self.records_url())
                .query(&[("page", page), ("per_page", PAGE_SIZE)])
                .timeout(LOOKUP_TIMEOUT);

            let response: CloudflareResponse<Vec<DnsRecord>> = self.send(request).await?;
            let batch = response
                .result
                .ok_or_else(|| DdnsError::Api("record list response has no result".to_string()))?;
            records.extend(batch);

            match response.result_info {
                Some(info) if info.page.max(page) < info.total_pages => page += 1,
                _ => break,
            }
        }

        tracing::debug!(zone = %self.zone_id, count = records.len(), "Listed DNS records");
        Ok(records)
    }

    async fn update_record(&self, record_id: &str, update: &RecordUpdate) -> Result<DnsRecord> {
        let request = self
            .client
            .put(format!("{}/{}", self.records_url(), record_id))
            .json(update)
            .timeout(UPDATE_TIMEOUT);

        let response: CloudflareResponse<DnsRecord> = self.send(request).await?;
        response
            .result
            .ok_or_else(|| DdnsError::Api("update response has no result".to_string()))
    }
}

impl fmt::Debug for CloudflareClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudflareClient")
            .field("email", &self.email)
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn describe(errors: &[CloudflareError]) -> String {
    if errors.is_empty() {
        return "provider reported failure without details".to_string();
    }

    errors
        .iter()
        .map(|e| format!("{}: {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

fn excerpt(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "empty response body".to_string();
    }
    body.chars().take(200).collect()
}
