//! Tracing subscriber setup

use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a JSON tracing subscriber.
///
/// `RUST_LOG` takes precedence; `default_filter` applies when it is unset.
/// Fails if a global subscriber is already installed.
pub fn init(default_filter: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()?;

    tracing::info!("Logging initialized");
    Ok(())
}
