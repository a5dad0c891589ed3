//! cloudflare-ddns - keeps a Cloudflare DNS record on your public IP.

use anyhow::Context;
use clap::Parser;
use cloudflare_ddns::config::Config;
use cloudflare_ddns::detector::IpDetector;
use cloudflare_ddns::providers::CloudflareClient;
use cloudflare_ddns::updater::Updater;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cloudflare-ddns")]
#[command(about = "Keeps a Cloudflare A/AAAA record in sync with your public IP")]
#[command(
    long_about = "Keeps a Cloudflare A/AAAA record in sync with your public IP.\n\n\
    All settings come from the environment (ZONEID, EMAIL, TOKEN, NAME, DOMAIN, \
    RECORDTYPE, RECORDID, SELECTEDITEM, IPURL, UPDATEINTERVAL, TTL, MINTTL) or \
    from a TOML file at $DDNS_CONFIG."
)]
#[command(version)]
struct Cli {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load().context("invalid configuration")?;
    tracing::debug!(?config, "Configuration loaded");

    let dns = CloudflareClient::new(&config)?;
    let detector = IpDetector::new(config.ip_url.clone())?;
    tracing::info!(ip_url = detector.url(), "Starting cloudflare-ddns");

    let updater = Updater::start(&config, dns, detector)
        .await
        .context("startup failed")?;

    let state = updater.run_until(shutdown_signal()).await;
    tracing::info!(last_ip = ?state.last_known_ip(), "Stopped");

    Ok(())
}

/// Resolves on SIGTERM or SIGINT.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Signal handlers unavailable, falling back to Ctrl-C");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    tracing::info!(signal = name, "Received shutdown signal");
}

/// Resolves on Ctrl-C.
#[cfg(not(unix))]
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!(signal = "SIGINT", "Received shutdown signal");
    }
}
