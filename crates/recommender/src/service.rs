//! Recommendation service
//!
//! In-process facade over the engine. Every call takes its own `Arc` to the
//! current snapshot, so a reload mid-request never mixes two snapshots.

use crate::catalog::Catalog;
use crate::cold_start::{ColdStartPolicy, HandleColdStartUser};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, LoadError};
use crate::explanation::{Explanation, ExplanationEngine};
use crate::fairness::{FairnessAudit, FairnessReport};
use crate::feedback::{ExplanationRef, FeedbackAck, FeedbackCollector};
use crate::handle::ModelHandle;
use crate::loader::SnapshotLoader;
use crate::model::FactorModel;
use crate::prediction::{Estimate, PredictionEngine};
use crate::ranker::{validate_request, Ranker};
use crate::types::{DetailLevel, FeedbackRating, ItemId, RatingRange, RecommendationList, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Snapshot status for the readiness probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Readiness {
    pub ready: bool,
    pub snapshot_id: Option<Uuid>,
    pub dim: Option<usize>,
    pub users: usize,
    pub items: usize,
}

/// An explanation together with the snapshot that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationResponse {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub detail_level: DetailLevel,
    pub snapshot_id: Uuid,
    pub explanation: Explanation,
}

impl ExplanationResponse {
    /// Reference for feedback about this explanation
    pub fn reference(&self) -> ExplanationRef {
        ExplanationRef {
            user_id: self.user_id,
            item_id: self.item_id,
            detail_level: self.detail_level,
            snapshot_id: Some(self.snapshot_id),
        }
    }
}

pub struct RecommendationService {
    handle: Arc<ModelHandle>,
    catalog: Arc<dyn Catalog>,
    feedback: FeedbackCollector,
    settings: EngineConfig,
    range: RatingRange,
}

impl RecommendationService {
    /// Fails with a validation error when the configured rating range is
    /// unusable for clamping.
    pub fn new(
        handle: Arc<ModelHandle>,
        catalog: Arc<dyn Catalog>,
        feedback: FeedbackCollector,
        settings: EngineConfig,
    ) -> EngineResult<Self> {
        let range = settings.rating_range()?;
        Ok(Self {
            handle,
            catalog,
            feedback,
            settings,
            range,
        })
    }

    pub fn handle(&self) -> &Arc<ModelHandle> {
        &self.handle
    }

    pub fn settings(&self) -> &EngineConfig {
        &self.settings
    }

    fn range(&self) -> RatingRange {
        self.range
    }

    /// Top-N recommendations for a user.
    ///
    /// Parameters are validated before the snapshot is touched. Users without
    /// trained factors are handled by the configured cold-start policy.
    pub fn get_recommendations(
        &self,
        user_id: UserId,
        top_n: usize,
        fairness_preference: f64,
    ) -> EngineResult<RecommendationList> {
        validate_request(top_n, fairness_preference)?;
        if top_n > self.settings.max_top_n {
            return Err(EngineError::validation(
                "top_n",
                format!("must be at most {}", self.settings.max_top_n),
            ));
        }

        let model = self.handle.current()?;

        let list = if HandleColdStartUser::is_cold(&model, user_id) {
            HandleColdStartUser::execute(
                &model,
                self.range(),
                self.settings.cold_start_policy,
                user_id,
                top_n,
                fairness_preference,
            )?
        } else {
            Ranker::new(&model, self.range()).rank(user_id, top_n, fairness_preference)?
        };

        tracing::info!(
            user_id,
            top_n,
            fairness_preference,
            returned = list.len(),
            cold_start = list.cold_start,
            snapshot_id = %list.snapshot_id,
            "Generated recommendations"
        );
        Ok(list)
    }

    /// Recommendations with the configured default size and fairness preference
    pub fn get_default_recommendations(&self, user_id: UserId) -> EngineResult<RecommendationList> {
        self.get_recommendations(
            user_id,
            self.settings.default_top_n,
            self.settings.default_fairness_preference,
        )
    }

    pub fn predict(&self, user_id: UserId, item_id: ItemId) -> EngineResult<f64> {
        let model = self.handle.current()?;
        PredictionEngine::new(&model, self.range()).predict(user_id, item_id)
    }

    /// Personalized estimate when possible, tagged fallback otherwise
    pub fn estimate(&self, user_id: UserId, item_id: ItemId) -> EngineResult<Estimate> {
        let model = self.handle.current()?;
        Ok(PredictionEngine::new(&model, self.range()).predict_or_fallback(user_id, item_id))
    }

    /// Explain one (user, item) pair. Only an unknown `detail_level` or a
    /// missing snapshot is an error; prediction failures come back as
    /// `Explanation::Unavailable`.
    pub fn explain(
        &self,
        user_id: UserId,
        item_id: ItemId,
        detail_level: &str,
    ) -> EngineResult<ExplanationResponse> {
        let level: DetailLevel = detail_level.parse()?;
        let model = self.handle.current()?;

        let explanation = ExplanationEngine::new(&model, self.range(), self.catalog.as_ref())
            .with_liked_threshold(self.settings.liked_threshold)
            .explain_level(user_id, item_id, level);
        Ok(ExplanationResponse {
            user_id,
            item_id,
            detail_level: level,
            snapshot_id: model.snapshot_id(),
            explanation,
        })
    }

    /// Always acknowledges; storage failures only flip `persisted`
    pub async fn submit_explanation_feedback(
        &self,
        explanation: ExplanationRef,
        rating: FeedbackRating,
        comment: Option<String>,
    ) -> FeedbackAck {
        self.feedback.record(explanation, rating, comment).await
    }

    /// Fairness metrics for a list against the current snapshot
    pub fn audit(&self, list: &RecommendationList) -> EngineResult<FairnessReport> {
        let model = self.handle.current()?;
        Ok(FairnessAudit::evaluate(
            &list.item_ids(),
            &model,
            self.catalog.as_ref(),
        ))
    }

    pub fn publish(&self, model: FactorModel) -> Option<Uuid> {
        self.handle.publish(model).map(|previous| previous.snapshot_id())
    }

    /// Load a new snapshot and publish it. On failure the served snapshot is
    /// left untouched.
    pub fn reload(&self, loader: &SnapshotLoader) -> Result<Uuid, LoadError> {
        let model = loader.load()?;
        let snapshot_id = model.snapshot_id();
        self.handle.publish(model);
        Ok(snapshot_id)
    }

    pub fn readiness(&self) -> Readiness {
        match self.handle.current() {
            Ok(model) => Readiness {
                ready: true,
                snapshot_id: Some(model.snapshot_id()),
                dim: Some(model.dim()),
                users: model.user_count(),
                items: model.item_count(),
            },
            Err(_) => Readiness {
                ready: false,
                snapshot_id: None,
                dim: None,
                users: 0,
                items: 0,
            },
        }
    }

    pub fn cold_start_policy(&self) -> ColdStartPolicy {
        self.settings.cold_start_policy
    }
}
