//! Mediation simulator binary
//!
//! Runs one service per ad format against a simulated network, tries to
//! show whatever is available on a fixed tick, then prints the analytics
//! events and metrics it produced.
//!
//! Environment:
//! - `MEDIATION_CONFIG`: TOML config file (otherwise `MEDIATION_*` variables)
//! - `SIM_DURATION_SECS`: how long to run (default 20)
//! - `SIM_FILL_RATE`: probability a load fills (default 0.6)

mod provider;

use anyhow::Context;
use mediation_core::debug::{DebugEntries, DebugSection};
use mediation_core::{Mediation, MediationConfig, MemoryAnalyticsSink, ShowOutcome};
use prometheus::{Encoder, TextEncoder};
use provider::{SimProvider, SimSettings};
use std::sync::Arc;
use std::time::Duration;

const SHOW_INTERVAL: Duration = Duration::from_millis(1_500);

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("Invalid {}: {:?}", key, value)),
        Err(_) => Ok(default),
    }
}

fn load_config() -> anyhow::Result<MediationConfig> {
    match std::env::var("MEDIATION_CONFIG") {
        Ok(path) => MediationConfig::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path)),
        Err(_) => MediationConfig::from_env().context("Failed to load config from environment"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting mediation simulator");

    let config = load_config()?;
    let duration = Duration::from_secs(env_or("SIM_DURATION_SECS", 20u64)?);
    let settings = SimSettings {
        fill_rate: env_or("SIM_FILL_RATE", SimSettings::default().fill_rate)?,
        ..SimSettings::default()
    };

    let analytics = Arc::new(MemoryAnalyticsSink::new());
    let mediation = Mediation::new(Arc::new(SimProvider::new(settings)), config)?
        .with_analytics(analytics.clone());

    let mut menu = DebugEntries::new();
    mediation.register_debug_entries(&mut menu);
    for entry in menu.section(DebugSection::Others) {
        tracing::info!(title = entry.title(), "Debug menu entry registered");
        entry.trigger();
    }

    let interstitial = mediation.interstitial("sim-interstitial");
    let rewarded = mediation.rewarded("sim-rewarded");
    let app_open = mediation.app_open("sim-app-open");
    let banner = mediation.banner("sim-banner");
    let native = mediation.native("sim-native");

    let mut ticker = tokio::time::interval(SHOW_INTERVAL);
    let deadline = tokio::time::Instant::now() + duration;
    let mut requested = 0usize;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcomes = [
                    interstitial.show_ad_if_available(),
                    rewarded.show_ad_if_available(),
                    app_open.show_ad_if_available(),
                    banner.show_ad_if_available(),
                    native.show_ad_if_available(),
                ];
                requested += outcomes
                    .iter()
                    .filter(|outcome| **outcome == ShowOutcome::Requested)
                    .count();
            }
            _ = tokio::time::sleep_until(deadline) => break,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    for snapshot in [
        interstitial.snapshot().await?,
        rewarded.snapshot().await?,
        app_open.snapshot().await?,
        banner.snapshot().await?,
        native.snapshot().await?,
    ] {
        println!("{}", serde_json::to_string(&snapshot)?);
    }

    interstitial.shutdown().await?;
    rewarded.shutdown().await?;
    app_open.shutdown().await?;
    banner.shutdown().await?;
    native.shutdown().await?;

    print!("{}", analytics.to_json_lines()?);

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&mediation.metrics().registry().gather(), &mut buffer)?;
    print!("{}", String::from_utf8(buffer)?);

    tracing::info!(shows_requested = requested, "Simulation finished");
    Ok(())
}
