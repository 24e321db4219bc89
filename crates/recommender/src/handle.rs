//! Atomically swappable reference to the served snapshot
//!
//! Readers clone the `Arc` under a short read lock and score against that
//! clone, so the lock is never held during scoring and a concurrent publish
//! can't change the snapshot underneath a request.

use crate::error::{EngineError, EngineResult};
use crate::model::FactorModel;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct ModelHandle {
    current: RwLock<Option<Arc<FactorModel>>>,
}

impl ModelHandle {
    /// Handle with no snapshot; every request fails with `ModelUnavailable`
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_model(model: FactorModel) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(model))),
        }
    }

    /// Snapshot to serve the current request with
    pub fn current(&self) -> EngineResult<Arc<FactorModel>> {
        let guard = self
            .current
            .read()
            .map_err(|_| EngineError::ModelUnavailable)?;
        guard.as_ref().map(Arc::clone).ok_or(EngineError::ModelUnavailable)
    }

    /// Replace the served snapshot, returning the previous one
    pub fn publish(&self, model: FactorModel) -> Option<Arc<FactorModel>> {
        let next = Arc::new(model);
        let snapshot_id = next.snapshot_id();

        let previous = match self.current.write() {
            Ok(mut guard) => guard.replace(next),
            Err(poisoned) => poisoned.into_inner().replace(next),
        };

        tracing::info!(
            %snapshot_id,
            previous = ?previous.as_ref().map(|m| m.snapshot_id()),
            "Published model snapshot"
        );
        previous
    }

    pub fn is_loaded(&self) -> bool {
        self.current().is_ok()
    }

    pub fn snapshot_id(&self) -> Option<Uuid> {
        self.current().ok().map(|m| m.snapshot_id())
    }
}
