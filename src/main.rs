//! Netdiag - Entry point.
//!
//! This binary runs the toolkit as a standalone diagnostic: it watches
//! reachability, pings the configured host, resolves it through DNS, and
//! periodically reports per-interface traffic deltas until Ctrl-C.

use std::borrow::Cow;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use netdiag::config::Config;
use netdiag::dns::{DnsResolutionResult, Resolver};
use netdiag::ping::{PingTarget, Pinger};
use netdiag::reachability::{
    InterfaceProbeSource, NoRadio, ReachabilityMonitor, ReachabilityTarget,
};
use netdiag::traffic::{TrafficSample, TrafficSampler};

/// Load configuration from `CONFIG_PATH`. A diagnostic tool should run bare,
/// so a missing file falls back to defaults instead of failing.
fn load_config() -> Result<Config> {
    let config_path = std::env::var("CONFIG_PATH")
        .map(Cow::Owned)
        .unwrap_or(Cow::Borrowed("config.toml"));

    if !std::path::Path::new(config_path.as_ref()).exists() {
        info!("No configuration at {config_path}, using defaults");
        return Ok(Config::default());
    }
    Config::load(config_path.as_ref()).context("Failed to load configuration")
}

/// Spawn the periodic traffic report. Logs the byte delta per interface
/// between consecutive samples.
fn spawn_traffic_task(interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let sampler = TrafficSampler::new();
        let mut previous: TrafficSample = sampler.summary();
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let current = sampler.summary();
            for (name, counters) in &current {
                let Some(before) = previous.get(name) else {
                    continue;
                };
                let rx = counters.rx_bytes.saturating_sub(before.rx_bytes);
                let tx = counters.tx_bytes.saturating_sub(before.tx_bytes);
                if rx > 0 || tx > 0 {
                    info!(interface = %name, rx_bytes = rx, tx_bytes = tx, "traffic");
                }
            }
            previous = current;
        }
    })
}

async fn run() -> Result<()> {
    let config = load_config()?;

    info!("Starting netdiag...");
    info!("Ping target: {}", config.ping.host);

    // Reachability: log every network type transition.
    let target = ReachabilityTarget::from_config(&config.reachability);
    let source = InterfaceProbeSource::new(target, config.reachability.poll_interval());
    let monitor = ReachabilityMonitor::new(source, NoRadio);
    let _listener = monitor.register(|network_type| {
        info!(%network_type, "network changed");
    });
    monitor.start_listening();

    // DNS: resolve the ping target once, report out of band.
    let resolver = Resolver::new(&config.dns);
    let resolution = resolver.resolve_host(config.ping.host.clone(), |result| match result {
        DnsResolutionResult::Success(address) => info!(%address, "resolved ping target"),
        DnsResolutionResult::Failure(error) => warn!(%error, "resolution failed"),
    });
    resolution.start();

    // Ping: one repeating task against the configured host.
    let pinger = Pinger::new(&config.ping);
    let task = pinger.task(PingTarget::Host(config.ping.host.clone()), |stats| {
        info!(
            transmitted = stats.transmitted,
            received = stats.received,
            loss_pct = stats.loss() * 100.0,
            min_ms = stats.min_rtt.as_secs_f64() * 1_000.0,
            avg_ms = stats.avg_rtt.as_secs_f64() * 1_000.0,
            max_ms = stats.max_rtt.as_secs_f64() * 1_000.0,
            "ping statistics",
        );
    });
    task.start();

    let traffic_handle = spawn_traffic_task(Duration::from_secs(5));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Ctrl-C received, shutting down...");

    task.stop();
    monitor.stop_listening();
    traffic_handle.abort();

    info!("Shutdown complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    run().await
}
