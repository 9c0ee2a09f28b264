//! Source watching and rebuilds.

use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use pipewright_pipeline::{Orchestrator, Target};
use tokio::sync::mpsc as async_mpsc;

/// Extensions whose changes trigger a rebuild.
pub const WATCHED_EXTENSIONS: [&str; 3] = ["js", "less", "handlebars"];

/// Events emitted by the file watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Created(path) | WatchEvent::Modified(path) | WatchEvent::Removed(path) => {
                path
            }
        }
    }
}

/// File watcher for detecting source changes.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch `root` recursively for changes to files with one of
    /// `extensions`.
    ///
    /// Returns the watcher and a channel to receive events. Every matching
    /// event is forwarded; the consumer decides how to batch them.
    pub fn new(
        root: &Path,
        extensions: &'static [&'static str],
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(std::io::Error::other)?;

        std::thread::spawn(move || {
            while let Ok(event) = sync_rx.recv() {
                for path in &event.paths {
                    if let Some(e) = classify_event(path, &event.kind, extensions) {
                        if async_tx.blocking_send(e).is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Classify a notify event into a WatchEvent.
fn classify_event(
    path: &Path,
    kind: &notify::EventKind,
    extensions: &[&str],
) -> Option<WatchEvent> {
    use notify::EventKind;

    let ext = path.extension().and_then(|e| e.to_str())?;
    if !extensions.contains(&ext) {
        return None;
    }

    match kind {
        EventKind::Create(_) => Some(WatchEvent::Created(path.to_path_buf())),
        EventKind::Remove(_) => Some(WatchEvent::Removed(path.to_path_buf())),
        EventKind::Modify(_) => Some(WatchEvent::Modified(path.to_path_buf())),
        _ => None,
    }
}

/// Rerun the default build for every batch of change events until the
/// channel closes. Returns the number of rebuilds.
///
/// Rebuilds never overlap: events arriving while a build runs are folded
/// into a single follow-up build.
pub async fn rebuild_on_change(
    orchestrator: Arc<Orchestrator>,
    mut rx: async_mpsc::Receiver<WatchEvent>,
) -> usize {
    let mut rebuilds = 0;

    while let Some(event) = rx.recv().await {
        let mut batched = 1;
        while rx.try_recv().is_ok() {
            batched += 1;
        }
        tracing::info!(
            "{} changed ({} events), rebuilding",
            event.path().display(),
            batched
        );

        let runner = Arc::clone(&orchestrator);
        match tokio::task::spawn_blocking(move || runner.run(&[Target::Default])).await {
            Ok(Ok(summary)) if summary.is_success() => {
                tracing::info!("Rebuilt in {} ms", summary.duration_ms)
            }
            Ok(Ok(summary)) => {
                tracing::warn!("Rebuild finished with {} failed tasks", summary.failed.len())
            }
            Ok(Err(e)) => tracing::error!("{}", e),
            Err(e) => tracing::error!("Rebuild panicked: {}", e),
        }
        rebuilds += 1;
    }

    rebuilds
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipewright_pipeline::BuildConfig;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn filters_by_extension() {
        let kind = notify::EventKind::Modify(notify::event::ModifyKind::Any);

        assert_eq!(
            classify_event(Path::new("src/main/less/screen.less"), &kind, &WATCHED_EXTENSIONS),
            Some(WatchEvent::Modified(PathBuf::from("src/main/less/screen.less")))
        );
        assert_eq!(
            classify_event(Path::new("src/main/html/index.html"), &kind, &WATCHED_EXTENSIONS),
            None
        );
        assert_eq!(classify_event(Path::new("src/Makefile"), &kind, &WATCHED_EXTENSIONS), None);
    }

    #[test]
    fn ignores_access_events() {
        let kind = notify::EventKind::Access(notify::event::AccessKind::Any);

        assert_eq!(classify_event(Path::new("a.js"), &kind, &WATCHED_EXTENSIONS), None);
    }

    #[tokio::test]
    async fn watches_file_changes() {
        let temp = tempdir().unwrap();
        let (watcher, mut rx) = FileWatcher::new(temp.path(), &WATCHED_EXTENSIONS).unwrap();

        // Give inotify time to set up
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();
        fs::write(temp.path().join("app.js"), "var a;").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv()).await;
        drop(watcher);

        let event = event.expect("timeout waiting for file watch event");
        let event = event.expect("channel should not be closed");
        assert_eq!(event.path().file_name().unwrap(), "app.js");
    }

    #[tokio::test]
    async fn coalesces_queued_events_into_one_rebuild() {
        let temp = tempdir().unwrap();
        let orchestrator = Arc::new(Orchestrator::new(BuildConfig::rooted(temp.path())));
        let (tx, rx) = async_mpsc::channel(8);
        for name in ["a.js", "b.less", "c.handlebars"] {
            tx.send(WatchEvent::Modified(PathBuf::from(name))).await.unwrap();
        }
        drop(tx);

        let rebuilds = rebuild_on_change(orchestrator, rx).await;

        assert_eq!(rebuilds, 1);
    }
}
