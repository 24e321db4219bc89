//! Scheduled snapshot reload
//!
//! Polls the modification times of the factor and ratings files. A change to
//! either is loaded on the blocking pool and published only if the whole load succeeds; otherwise the
//! current snapshot keeps serving.

use crate::error::LoadError;
use crate::handle::ModelHandle;
use crate::loader::SnapshotLoader;
use crate::model::FactorModel;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

/// Modification times of both snapshot inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SourceStamp {
    factors: SystemTime,
    ratings: SystemTime,
}

pub struct SnapshotWatcher {
    loader: SnapshotLoader,
    handle: Arc<ModelHandle>,
    interval: Duration,
    last_seen: Option<SourceStamp>,
}

impl SnapshotWatcher {
    /// Treats the input files as they are now as already served
    pub fn new(loader: SnapshotLoader, handle: Arc<ModelHandle>, interval: Duration) -> Self {
        let modified = |path: &Path| std::fs::metadata(path).and_then(|m| m.modified()).ok();
        let last_seen = match (
            modified(loader.factors_path()),
            modified(loader.ratings_path()),
        ) {
            (Some(factors), Some(ratings)) => Some(SourceStamp { factors, ratings }),
            _ => None,
        };
        Self {
            loader,
            handle,
            interval,
            last_seen,
        }
    }

    /// Reload if the factor or ratings file changed, or if nothing is served
    /// yet. Returns the new snapshot id when one was published.
    pub async fn check_once(&mut self) -> Result<Option<Uuid>, LoadError> {
        let stamp = SourceStamp {
            factors: modified_at(self.loader.factors_path()).await?,
            ratings: modified_at(self.loader.ratings_path()).await?,
        };

        if self.handle.is_loaded() && self.last_seen == Some(stamp) {
            return Ok(None);
        }

        let model = load_blocking(&self.loader).await?;

        let snapshot_id = model.snapshot_id();
        self.handle.publish(model);
        self.last_seen = Some(stamp);
        Ok(Some(snapshot_id))
    }

    /// Poll until `shutdown` flips to true or its sender is dropped
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        tracing::info!(
            path = %self.loader.factors_path().display(),
            interval_secs = self.interval.as_secs(),
            "Snapshot watcher started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.check_once().await {
                        Ok(Some(snapshot_id)) => {
                            tracing::info!(%snapshot_id, "Reloaded model snapshot");
                        }
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                "Snapshot reload failed, keeping current snapshot"
                            );
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Snapshot watcher stopped");
    }
}

/// Full snapshot load on the blocking pool
pub async fn load_blocking(loader: &SnapshotLoader) -> Result<FactorModel, LoadError> {
    let loader = loader.clone();
    tokio::task::spawn_blocking(move || loader.load())
        .await
        .map_err(|e| LoadError::InvalidSnapshot(format!("load task failed: {}", e)))?
}

async fn modified_at(path: &Path) -> Result<SystemTime, LoadError> {
    tokio::fs::metadata(path)
        .await
        .and_then(|m| m.modified())
        .map_err(|e| LoadError::io(path, e))
}
