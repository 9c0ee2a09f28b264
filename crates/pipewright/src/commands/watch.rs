//! Rebuild on source changes.

use std::sync::Arc;

use anyhow::{Context, Result};
use pipewright_pipeline::{BuildConfig, Orchestrator};
use pipewright_server::{rebuild_on_change, watcher::WATCHED_EXTENSIONS, FileWatcher, LiveReloadHub};

/// Watch the source tree and rerun the default build on change, notifying
/// `hub` after rebuilt bundles and stylesheets.
pub async fn run(config: BuildConfig, hub: Option<LiveReloadHub>) -> Result<()> {
    let watch_dir = config.watch_dir.clone();
    let mut orchestrator = Orchestrator::new(config);
    if let Some(hub) = hub {
        orchestrator = orchestrator.with_notifier(Arc::new(hub));
    }

    let (watcher, rx) = FileWatcher::new(&watch_dir, &WATCHED_EXTENSIONS)
        .with_context(|| format!("Failed to watch {}", watch_dir.display()))?;

    tracing::info!(
        "Watching {} for *.{{{}}} changes",
        watch_dir.display(),
        WATCHED_EXTENSIONS.join(",")
    );

    rebuild_on_change(Arc::new(orchestrator), rx).await;

    // Keep watcher alive
    drop(watcher);

    Ok(())
}
