//! Drives the engine: a periodic poll timer plus a debounced filesystem
//! watch on the mirror root for ledger edits.
//!
//! Both triggers funnel into one loop, so engine runs never overlap; a
//! trigger arriving mid-run waits its turn instead of being dropped. The
//! poll sleep is re-created after every attempt (success or failure), which
//! keeps exactly one pending timer alive at all times.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::sync::SyncEngine;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Settle delay between a watch event and the ledger re-read, so a write in
/// progress (an editor save, our own merge) can finish first.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

pub struct Scheduler {
    engine: Arc<SyncEngine>,
    poll_interval: Duration,
    debounce: Duration,
}

impl Scheduler {
    pub fn new(engine: Arc<SyncEngine>, poll_interval: Duration, debounce: Duration) -> Self {
        Self {
            engine,
            poll_interval,
            debounce,
        }
    }

    /// Run until the token is cancelled. There is no mid-operation
    /// cancellation: a run in progress finishes, then the loop exits.
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let root = self.engine.store().root().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;

        let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            match result {
                Ok(event) => {
                    if !(event.kind.is_create() || event.kind.is_modify()) {
                        return;
                    }
                    for path in event.paths {
                        if !is_raster_artifact(&path) {
                            let _ = tx.send(path);
                        }
                    }
                }
                Err(e) => tracing::warn!(error = %e, "mirror watch error"),
            }
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;
        tracing::info!(root = %root.display(), interval_secs = self.poll_interval.as_secs(), "scheduler running");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("scheduler stopping");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.poll_interval) => {
                    if let Err(e) = self.engine.poll(false).await {
                        tracing::warn!(error = %e, "scheduled poll failed, will retry on the next interval");
                    }
                }
                Some(path) = rx.recv() => {
                    tokio::time::sleep(self.debounce).await;
                    let mut buckets = BTreeSet::new();
                    if let Some(dir) = bucket_dir_of(&path) {
                        buckets.insert(dir);
                    }
                    // Collapse the burst that accumulated during the settle delay.
                    while let Ok(path) = rx.try_recv() {
                        if let Some(dir) = bucket_dir_of(&path) {
                            buckets.insert(dir);
                        }
                    }
                    for dir in buckets {
                        if let Err(e) = self.engine.reconcile_from_ledger(&dir).await {
                            tracing::warn!(bucket = %dir.display(), error = %e, "ledger reconciliation failed");
                        }
                    }
                }
            }
        }
    }
}

/// Rasterized page files churn constantly during materialization; watching
/// them would only feed our own writes back to us.
fn is_raster_artifact(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

/// Map a watch event path to the bucket directory it belongs to.
fn bucket_dir_of(path: &Path) -> Option<PathBuf> {
    if path.is_dir() {
        return Some(path.to_path_buf());
    }
    path.parent().map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_artifacts_are_filtered() {
        assert!(is_raster_artifact(Path::new("/m/20231201/5-Invoice.0.png")));
        assert!(is_raster_artifact(Path::new("/m/20231201/5-Invoice.0.PNG")));
        assert!(!is_raster_artifact(Path::new("/m/20231201/0info.txt")));
        assert!(!is_raster_artifact(Path::new("/m/20231201")));
    }

    #[test]
    fn event_paths_map_to_their_bucket_directory() {
        let dir = std::env::temp_dir().join("faxmirror-sched-tests").join("20231201");
        std::fs::create_dir_all(&dir).unwrap();

        // A file event resolves to its parent, a directory event to itself.
        assert_eq!(bucket_dir_of(&dir.join("0info.txt")), Some(dir.clone()));
        assert_eq!(bucket_dir_of(&dir), Some(dir.clone()));
    }
}
