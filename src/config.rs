//! Configuration management for cloudflare-ddns.
//!
//! Settings come from an optional TOML file and the process environment,
//! with environment values winning. The result is a single immutable
//! [`Config`] handed to every other component; nothing else reads the
//! environment.

use crate::error::{DdnsError, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_VAR: &str = "DDNS_CONFIG";

/// Default provider API root.
pub const DEFAULT_API_URL: &str = "https://api.cloudflare.com/client/v4";

/// Default public-IP lookup endpoint.
pub const DEFAULT_IP_URL: &str = "http://ifconfig.me";

/// Polling never happens more often than this.
pub const MIN_UPDATE_INTERVAL_SECS: u64 = 60;

const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 300;
const DEFAULT_RECORD_TYPE: &str = "A";
const DEFAULT_MIN_TTL: u32 = 60;

/// TTL value the provider interprets as "automatic".
pub const AUTO_TTL: u32 = 1;

/// Main configuration structure.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Zone apex, e.g. "example.com".
    pub domain: Option<String>,
    /// Host part, full name, or "@" for the apex.
    pub name: Option<String>,
    /// Record type to manage (default: "A").
    pub record_type: String,
    /// Whether the record type was set rather than defaulted.
    pub record_type_explicit: bool,
    /// Endpoint returning the caller's public IP as plain text.
    pub ip_url: String,
    /// Provider account email.
    pub email: String,
    /// Provider API token.
    pub token: String,
    /// Provider zone identifier.
    pub zone_id: String,
    /// Explicit record id; takes priority over name matching.
    pub record_id: Option<String>,
    /// Position among several records sharing the target name and type.
    pub selected_item: Option<usize>,
    /// Seconds between polls (default: 300, never below 60).
    pub update_interval_secs: u64,
    /// Record TTL in seconds; 1 means automatic.
    pub ttl: u32,
    /// Smallest non-automatic TTL the provider accepts.
    pub min_ttl: u32,
    /// Provider API root.
    pub api_url: String,
}

/// On-disk form of the configuration. Every field is optional; the
/// environment fills in or overrides whatever is set here.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub domain: Option<String>,
    pub name: Option<String>,
    pub record_type: Option<String>,
    pub ip_url: Option<String>,
    pub email: Option<String>,
    pub token: Option<String>,
    pub zone_id: Option<String>,
    pub record_id: Option<String>,
    pub selected_item: Option<usize>,
    pub update_interval: Option<u64>,
    pub ttl: Option<u32>,
    pub min_ttl: Option<u32>,
    pub api_url: Option<String>,
}

impl FileConfig {
    /// Load a config file from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FileConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Config {
    /// Build the configuration from the config file (if any) and the
    /// process environment.
    pub fn load() -> Result<Self> {
        let file = match config_file_path() {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Reading config file");
                FileConfig::load_from(&path)?
            }
            None => FileConfig::default(),
        };

        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Build the configuration from file values and a key lookup.
    ///
    /// Lookup values win over file values. Blank values count as unset.
    pub fn from_sources<F>(file: FileConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, fallback: Option<String>| -> Option<String> {
            non_blank(lookup(key)).or_else(|| non_blank(fallback))
        };

        let zone_id = text("ZONEID", file.zone_id).ok_or_else(|| missing("ZONEID"))?;
        let email = text("EMAIL", file.email).ok_or_else(|| missing("EMAIL"))?;
        let token = text("TOKEN", file.token).ok_or_else(|| missing("TOKEN"))?;

        let domain = text("DOMAIN", file.domain);
        let name = text("NAME", file.name);
        let record_id = text("RECORDID", file.record_id);

        if record_id.is_none() && name.is_none() && domain.is_none() {
            return Err(DdnsError::Config(
                "one of RECORDID, NAME or DOMAIN must be set".to_string(),
            ));
        }

        let selected_item = number("SELECTEDITEM", lookup("SELECTEDITEM"), file.selected_item)?;

        let mut update_interval_secs = number(
            "UPDATEINTERVAL",
            lookup("UPDATEINTERVAL"),
            file.update_interval,
        )?
        .unwrap_or(DEFAULT_UPDATE_INTERVAL_SECS);
        if update_interval_secs < MIN_UPDATE_INTERVAL_SECS {
            tracing::warn!(
                requested = update_interval_secs,
                minimum = MIN_UPDATE_INTERVAL_SECS,
                "Update interval too short, using minimum"
            );
            update_interval_secs = MIN_UPDATE_INTERVAL_SECS;
        }

        let min_ttl = number("MINTTL", lookup("MINTTL"), file.min_ttl)?.unwrap_or(DEFAULT_MIN_TTL);
        let ttl = normalize_ttl(
            number("TTL", lookup("TTL"), file.ttl)?.unwrap_or(AUTO_TTL),
            min_ttl,
        );

        let record_type = text("RECORDTYPE", file.record_type);

        Ok(Self {
            domain,
            name,
            record_type_explicit: record_type.is_some(),
            record_type: record_type.unwrap_or_else(|| DEFAULT_RECORD_TYPE.to_string()),
            ip_url: text("IPURL", file.ip_url).unwrap_or_else(|| DEFAULT_IP_URL.to_string()),
            email,
            token,
            zone_id,
            record_id,
            selected_item,
            update_interval_secs,
            ttl,
            min_ttl,
            api_url: text("APIURL", file.api_url).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        })
    }

    /// Time to sleep between polls.
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }
}

// The token must never reach the logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("domain", &self.domain)
            .field("name", &self.name)
            .field("record_type", &self.record_type)
            .field("record_type_explicit", &self.record_type_explicit)
            .field("ip_url", &self.ip_url)
            .field("email", &self.email)
            .field("token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("record_id", &self.record_id)
            .field("selected_item", &self.selected_item)
            .field("update_interval_secs", &self.update_interval_secs)
            .field("ttl", &self.ttl)
            .field("min_ttl", &self.min_ttl)
            .field("api_url", &self.api_url)
            .finish()
    }
}

fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = non_blank(std::env::var(CONFIG_PATH_VAR).ok()) {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir()
        .map(|p| p.join("cloudflare-ddns").join("config.toml"))
        .filter(|p| p.exists())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn missing(key: &str) -> DdnsError {
    DdnsError::Config(format!("{} is required", key))
}

fn number<T: FromStr>(key: &str, raw: Option<String>, fallback: Option<T>) -> Result<Option<T>> {
    match non_blank(raw) {
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| DdnsError::Config(format!("{} must be a non-negative integer, got {:?}", key, v))),
        None => Ok(fallback),
    }
}

fn normalize_ttl(ttl: u32, min_ttl: u32) -> u32 {
    if ttl == 0 {
        tracing::warn!("TTL 0 is not valid, using automatic TTL");
        return AUTO_TTL;
    }
    if ttl != AUTO_TTL && ttl < min_ttl {
        tracing::warn!(requested = ttl, minimum = min_ttl, "TTL below provider minimum, raising it");
        return min_ttl;
    }
    ttl
}
