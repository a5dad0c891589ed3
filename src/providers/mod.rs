//! DNS provider API.

mod cloudflare;


pub use cloudflare::CloudflareClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A record as the provider reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub content: String,
    #[serde(default)]
    pub ttl: u32,
    #[serde(default)]
    pub proxied: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Full replacement payload for a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordUpdate {
    pub content: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    /// Always false: the edge proxy is not managed here.
    pub proxied: bool,
    pub comment: String,
    pub ttl: u32,
}

impl RecordUpdate {
    /// Payload pointing `name`/`record_type` at `content`, stamped with the
    /// current time.
    pub fn new(content: &str, name: &str, record_type: &str, ttl: u32) -> Self {
        Self {
            content: content.to_string(),
            name: name.to_string(),
            record_type: record_type.to_string(),
            proxied: false,
            comment: format!(
                "IP updated at {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
            ),
            ttl,
        }
    }
}

/// Operations the updater needs from a DNS provider.
///
/// Every method must report transport, HTTP and provider-level failures as
/// errors; an `Ok` means the provider confirmed the operation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DnsApi: Send + Sync {
    /// Check that the credentials are accepted.
    async fn verify_auth(&self) -> Result<()>;

    /// All records in the zone, in provider order.
    async fn list_records(&self) -> Result<Vec<DnsRecord>>;

    /// Replace a record and return the provider's view of it.
    async fn update_record(&self, record_id: &str, update: &RecordUpdate) -> Result<DnsRecord>;
}
