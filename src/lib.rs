pub mod backend;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod models;
pub mod policy;
pub mod routing;
pub mod services;
pub mod session;
pub mod state;
pub mod validation;

pub use config::Config;
pub use envelope::Outcome;
pub use error::{AccessError, StoreError};
pub use gateway::Gateway;
pub use state::SharedState;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `general.log_level`. Hosts that install their own
/// subscriber should skip this.
pub fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.general.log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .context("Failed to install JSON tracing subscriber")?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .context("Failed to install tracing subscriber")?;
    }

    Ok(())
}
