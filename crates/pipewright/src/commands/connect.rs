//! Development server command.

use anyhow::Result;
use pipewright_server::{DevServer, DevServerConfig, LiveReloadHub};

/// Serve the output directory until stopped.
pub async fn run(config: DevServerConfig, hub: LiveReloadHub) -> Result<()> {
    if !config.root.exists() {
        tracing::warn!(
            "{} does not exist yet. Run 'pipewright' to build it.",
            config.root.display()
        );
    }

    DevServer::new(config, hub).start().await?;

    Ok(())
}
