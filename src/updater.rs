//! The long-running update loop.
//!
//! Startup verifies credentials, resolves the managed record and seeds the
//! last known IP. If the record's published content already differs from
//! that IP, startup issues one PUT to correct it; when that PUT fails the
//! last known IP is seeded with the published content instead, so the first
//! cycle retries. After that every cycle fetches the public IP and pushes it
//! to the provider only when it differs from the last confirmed value.
//!
//! A failed update leaves the last known IP untouched, so the change is
//! retried on the next cycle. If the address flips back to the old value
//! before a retry succeeds, no further update is attempted for it; the
//! record is only corrected on the next real change.

use crate::config::Config;
use crate::detector::IpSource;
use crate::error::Result;
use crate::providers::{DnsApi, DnsRecord, RecordUpdate};
use crate::selector::{self, ManagedTarget};
use std::future::Future;
use std::time::Duration;

/// Mutable state carried between cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    last_known_ip: Option<String>,
}

impl RunState {
    /// Last address confirmed on the provider (or seeded at startup).
    pub fn last_known_ip(&self) -> Option<&str> {
        self.last_known_ip.as_deref()
    }
}

/// What a single poll did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Public IP matches the last known value.
    Unchanged,
    /// The record now points at `current`.
    Updated {
        previous: Option<String>,
        current: String,
    },
    /// The public IP could not be fetched.
    LookupFailed,
    /// The provider rejected or never confirmed the update.
    UpdateFailed,
}

/// Keeps one record in sync with the public IP.
#[derive(Debug)]
pub struct Updater<D, I> {
    dns: D,
    ip: I,
    target: ManagedTarget,
    state: RunState,
    ttl: u32,
    interval: Duration,
}

impl<D: DnsApi, I: IpSource> Updater<D, I> {
    /// Run the startup phase. Any error here is fatal.
    pub async fn start(config: &Config, dns: D, ip: I) -> Result<Self> {
        dns.verify_auth().await.inspect_err(|e| {
            tracing::error!(layer = e.layer(), error = %e, "Credential check failed");
        })?;
        tracing::info!("Credentials verified");

        let records = dns.list_records().await.inspect_err(|e| {
            tracing::error!(layer = e.layer(), error = %e, zone = %config.zone_id, "Listing records failed");
        })?;

        let target = selector::resolve(&records, config)?;
        tracing::info!(
            record = %target.record_id,
            name = %target.record_name,
            record_type = %target.record_type,
            "Managing DNS record"
        );

        let current = ip.fetch_public_ip().await.inspect_err(|e| {
            tracing::error!(layer = e.layer(), error = %e, "Initial public IP lookup failed");
        })?;

        let mut updater = Self {
            dns,
            ip,
            target,
            state: RunState {
                last_known_ip: Some(current.clone()),
            },
            ttl: config.ttl,
            interval: config.update_interval(),
        };

        let published = records
            .iter()
            .find(|r| r.id == updater.target.record_id)
            .map(|r| r.content.clone());

        if let Some(published) = published.filter(|content| *content != current) {
            tracing::info!(published = %published, ip = %current, "Record is stale, updating");
            if updater.push(&current).await.is_err() {
                // Retry on the next cycle instead of trusting the seed.
                updater.state.last_known_ip = Some(published);
            }
        }

        Ok(updater)
    }

    /// The record being managed.
    pub fn target(&self) -> &ManagedTarget {
        &self.target
    }

    /// Current loop state.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Poll once and update the record if the IP moved.
    pub async fn poll_once(&mut self) -> CycleOutcome {
        let current = match self.ip.fetch_public_ip().await {
            Ok(ip) => ip,
            Err(e) => {
                tracing::warn!(layer = e.layer(), error = %e, "Public IP lookup failed, skipping cycle");
                return CycleOutcome::LookupFailed;
            }
        };

        if self.state.last_known_ip() == Some(current.as_str()) {
            tracing::info!(ip = %current, "IP unchanged");
            return CycleOutcome::Unchanged;
        }

        match self.push(&current).await {
            Ok(_) => {
                let previous = self.state.last_known_ip.replace(current.clone());
                CycleOutcome::Updated { previous, current }
            }
            Err(_) => CycleOutcome::UpdateFailed,
        }
    }

    /// Poll and sleep until `shutdown` resolves.
    ///
    /// Shutdown interrupts an in-flight request or a pending sleep.
    pub async fn run_until<F>(mut self, shutdown: F) -> RunState
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!(interval_secs = self.interval.as_secs(), "Entering update loop");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, leaving update loop");
                    return self.state;
                }
                _ = self.cycle() => {}
            }
        }
    }

    async fn cycle(&mut self) {
        self.poll_once().await;
        tokio::time::sleep(self.interval).await;
    }

    async fn push(&self, ip: &str) -> Result<DnsRecord> {
        let update = RecordUpdate::new(
            ip,
            &self.target.record_name,
            &self.target.record_type,
            self.ttl,
        );

        match self.dns.update_record(&self.target.record_id, &update).await {
            Ok(record) => {
                tracing::info!(
                    record = %record.id,
                    name = %record.name,
                    ip = %record.content,
                    "DNS record updated"
                );
                if record.content != ip {
                    tracing::warn!(expected = ip, got = %record.content, "Provider echoed different content");
                }
                Ok(record)
            }
            Err(e) => {
                tracing::error!(
                    layer = e.layer(),
                    error = %e,
                    record = %self.target.record_id,
                    ip,
                    "DNS record update failed"
                );
                Err(e)
            }
        }
    }
}
