//! Run build targets.

use anyhow::Result;
use pipewright_pipeline::{BuildConfig, Orchestrator, Target};

/// Run `target` with its prerequisites. Fails when any task failed.
pub fn run(config: BuildConfig, target: Target) -> Result<()> {
    let summary = Orchestrator::new(config).run(&[target])?;

    if !summary.is_success() {
        let failed: Vec<String> = summary.failed.iter().map(|(t, _)| t.to_string()).collect();
        anyhow::bail!(
            "'{}' finished with failed tasks: {}",
            target,
            failed.join(", ")
        );
    }

    tracing::info!(
        "Finished '{}' ({} tasks) in {}ms",
        target,
        summary.ran.len(),
        summary.duration_ms
    );

    Ok(())
}
