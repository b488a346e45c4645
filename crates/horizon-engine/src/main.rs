//! # Horizon
//!
//! Headless flythrough over an endless streamed heightfield.
//!
//! Loads `horizon.toml` (or the path given as the first argument), builds
//! the terrain cache and flies a camera across it for a fixed number of
//! frames. `horizon --write-config` writes the default `horizon.toml`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;
mod renderer;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::EngineConfig;

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("horizon=info".parse()?))
        .init();

    info!("Horizon starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = match std::env::args().nth(1).as_deref() {
        Some("--write-config") => {
            EngineConfig::default().save()?;
            return Ok(());
        },
        Some(path) => EngineConfig::try_load_from(path)?,
        None => EngineConfig::load(),
    };
    config.validate();

    let summary = app::run(&config)?;
    info!(
        "Ended at ({:.0}, {:.0}) in chunk {} after {} frames ({} chunk draws, {} culled)",
        summary.final_position.x,
        summary.final_position.z,
        summary.final_chunk,
        summary.frames,
        summary.chunks_drawn,
        summary.chunks_culled
    );

    info!("Horizon shutdown complete");
    Ok(())
}
