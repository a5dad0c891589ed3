//! # cloudflare-ddns
//!
//! Keeps one Cloudflare `A`/`AAAA` record pointed at the machine's public IP.
//!
//! ## How it works
//!
//! - At startup: verify credentials, list the zone's records, pick the one
//!   to manage, and fetch the current public IP.
//! - Then forever: fetch the public IP every `UPDATEINTERVAL` seconds and
//!   rewrite the record only when the address changed.
//!
//! ## Usage
//!
//! ```bash
//! ZONEID=... EMAIL=me@example.com TOKEN=... \
//!   NAME=home DOMAIN=example.com \
//!   cloudflare-ddns
//! ```
//!
//! Settings can also live in `~/.config/cloudflare-ddns/config.toml` (or
//! the file named by `DDNS_CONFIG`); environment variables win.

pub mod config;
pub mod detector;
pub mod error;
pub mod providers;
pub mod selector;
pub mod updater;

pub use config::Config;
pub use detector::{IpDetector, IpSource};
pub use error::{DdnsError, Result};
pub use providers::{CloudflareClient, DnsApi, DnsRecord};
pub use selector::{ManagedTarget, ResolutionError};
pub use updater::{CycleOutcome, RunState, Updater};
