//! Serve with live reload and rebuild on change.

use anyhow::Result;
use pipewright_pipeline::BuildConfig;
use pipewright_server::{DevServerConfig, LiveReloadHub};

use super::{connect, watch};

/// Run `connect` and `watch` together, sharing one live-reload hub.
pub async fn run(build: BuildConfig, server: DevServerConfig) -> Result<()> {
    let hub = LiveReloadHub::new();

    tokio::try_join!(
        connect::run(server, hub.clone()),
        watch::run(build, Some(hub)),
    )?;

    Ok(())
}
