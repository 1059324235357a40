//! Logging initialization.

use crate::config::LoggingSettings;
use crate::error::{NetvaultError, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber from logging settings.
///
/// The `NETVAULT_LOG` environment variable overrides the configured level
/// and accepts the same filter syntax as `RUST_LOG`.
pub fn init(settings: &LoggingSettings) -> Result<()> {
    let filter = EnvFilter::try_from_env("NETVAULT_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if settings.json {
        subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| NetvaultError::Internal(format!("Failed to init logging: {}", e)))?;
    } else {
        subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| NetvaultError::Internal(format!("Failed to init logging: {}", e)))?;
    }

    info!("Logging initialized");
    Ok(())
}
