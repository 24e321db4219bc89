//! Fairness-adjustable top-N ranking
//!
//! Steps:
//! 1. Generate candidates (unrated items known to the model)
//! 2. Score each candidate in parallel; unscoreable items are skipped
//! 3. Compute the inverse-popularity fairness score per candidate
//! 4. Min-max normalize both signals across the candidate set
//! 5. Blend: `(1 - w) * predicted + w * fairness`, `w = preference / 100`
//! 6. Sort by blended score, then predicted score, then item id; truncate

use crate::candidates::CandidateGenerator;
use crate::error::{EngineError, EngineResult};
use crate::fairness::{blend, blend_weight, min_max_normalize, FairnessScorer};
use crate::model::FactorModel;
use crate::prediction::PredictionEngine;
use crate::types::{ItemId, RatingRange, RecommendationList, ScoredItem, UserId};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeSet;

pub const MIN_FAIRNESS_PREFERENCE: f64 = 0.0;
pub const MAX_FAIRNESS_PREFERENCE: f64 = 100.0;

/// Reject malformed parameters before touching the model
pub fn validate_request(top_n: usize, fairness_preference: f64) -> EngineResult<()> {
    if top_n == 0 {
        return Err(EngineError::validation("top_n", "must be greater than 0"));
    }
    if !fairness_preference.is_finite()
        || !(MIN_FAIRNESS_PREFERENCE..=MAX_FAIRNESS_PREFERENCE).contains(&fairness_preference)
    {
        return Err(EngineError::validation(
            "fairness_preference",
            format!("must be within [0, 100], got {}", fairness_preference),
        ));
    }
    Ok(())
}

/// Total order used for every ranked list
pub fn ranking_order(a: &ScoredItem, b: &ScoredItem) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.predicted_score.total_cmp(&a.predicted_score))
        .then_with(|| a.item_id.cmp(&b.item_id))
}

#[derive(Debug, Clone, Copy)]
pub struct Ranker<'a> {
    model: &'a FactorModel,
    predictor: PredictionEngine<'a>,
    fairness: FairnessScorer<'a>,
    candidates: CandidateGenerator<'a>,
}

impl<'a> Ranker<'a> {
    pub fn new(model: &'a FactorModel, range: RatingRange) -> Self {
        Self {
            model,
            predictor: PredictionEngine::new(model, range),
            fairness: FairnessScorer::new(model),
            candidates: CandidateGenerator::new(model),
        }
    }

    /// Personalized top-N for a user with trained factors
    pub fn rank(
        &self,
        user_id: UserId,
        top_n: usize,
        fairness_preference: f64,
    ) -> EngineResult<RecommendationList> {
        validate_request(top_n, fairness_preference)?;

        let candidates = self.candidates.candidates(user_id)?;
        if !self.model.knows_user(user_id) {
            // history without factors still can't be scored
            return Err(EngineError::UnknownUser(user_id));
        }

        self.rank_candidates(user_id, &candidates, top_n, fairness_preference)
    }

    /// Rank an explicitly supplied candidate set with personalized predictions
    pub fn rank_candidates(
        &self,
        user_id: UserId,
        candidates: &BTreeSet<ItemId>,
        top_n: usize,
        fairness_preference: f64,
    ) -> EngineResult<RecommendationList> {
        validate_request(top_n, fairness_preference)?;
        if !self.model.knows_user(user_id) {
            return Err(EngineError::UnknownUser(user_id));
        }

        let items = self.rank_with(candidates, top_n, fairness_preference, |item_id| {
            self.predictor.predict(user_id, item_id)
        })?;
        Ok(self.list(user_id, fairness_preference, items, false))
    }

    /// Population-level ranking for a user the model knows nothing about.
    ///
    /// Every item is scored with the non-personalized baseline
    /// (`global_mean + item_bias`) and blended with the same fairness rule.
    pub fn rank_fallback(
        &self,
        user_id: UserId,
        top_n: usize,
        fairness_preference: f64,
    ) -> EngineResult<RecommendationList> {
        validate_request(top_n, fairness_preference)?;

        let mut candidates = self.candidates.population();
        for rated in self.model.rated_items(user_id) {
            candidates.remove(&rated);
        }

        let items = self.rank_with(&candidates, top_n, fairness_preference, |item_id| {
            Ok(self.predictor.baseline(item_id))
        })?;
        Ok(self.list(user_id, fairness_preference, items, true))
    }

    fn rank_with<F>(
        &self,
        candidates: &BTreeSet<ItemId>,
        top_n: usize,
        fairness_preference: f64,
        score: F,
    ) -> EngineResult<Vec<ScoredItem>>
    where
        F: Fn(ItemId) -> EngineResult<f64> + Sync,
    {
        let ids: Vec<ItemId> = candidates.iter().copied().collect();

        let outcomes: Vec<(ItemId, EngineResult<f64>)> =
            ids.par_iter().map(|&id| (id, score(id))).collect();

        let mut scored_ids = Vec::with_capacity(outcomes.len());
        let mut predicted = Vec::with_capacity(outcomes.len());
        let mut skipped = 0usize;
        for (item_id, outcome) in outcomes {
            match outcome {
                Ok(value) => {
                    scored_ids.push(item_id);
                    predicted.push(value);
                }
                Err(err) if err.is_candidate_local() => skipped += 1,
                Err(err) => return Err(err),
            }
        }

        let fairness: Vec<f64> = scored_ids.iter().map(|&id| self.fairness.score(id)).collect();
        let norm_predicted = min_max_normalize(&predicted);
        let norm_fairness = min_max_normalize(&fairness);
        let weight = blend_weight(fairness_preference);

        let mut items: Vec<ScoredItem> = scored_ids
            .iter()
            .enumerate()
            .map(|(idx, &item_id)| ScoredItem {
                item_id,
                score: blend(norm_predicted[idx], norm_fairness[idx], weight),
                predicted_score: predicted[idx],
                fairness_score: fairness[idx],
            })
            .collect();

        items.sort_by(ranking_order);
        items.truncate(top_n);

        tracing::debug!(
            candidates = ids.len(),
            skipped,
            returned = items.len(),
            weight,
            "Ranked candidates"
        );

        Ok(items)
    }

    fn list(
        &self,
        user_id: UserId,
        fairness_preference: f64,
        items: Vec<ScoredItem>,
        cold_start: bool,
    ) -> RecommendationList {
        RecommendationList {
            user_id,
            fairness_preference,
            items,
            snapshot_id: self.model.snapshot_id(),
            cold_start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FactorModelBuilder;

    fn model() -> FactorModel {
        FactorModelBuilder::new(1)
            .global_mean(3.0)
            .user(1, 0.0, vec![1.0])
            .item(10, 0.0, vec![1.5])
            .item(11, 0.0, vec![1.0])
            .item(12, 0.0, vec![0.5])
            .item(13, 0.0, vec![-0.5])
            .rating(1, 13, 2.0)
            .rating(2, 10, 5.0)
            .rating(3, 10, 5.0)
            .rating(2, 11, 4.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_validation_happens_first() {
        let model = model();
        let ranker = Ranker::new(&model, RatingRange::default());

        assert_eq!(ranker.rank(99999, 0, 50.0).unwrap_err().code(), "validation_error");
        assert_eq!(ranker.rank(1, 5, 100.5).unwrap_err().code(), "validation_error");
        assert_eq!(ranker.rank(1, 5, -1.0).unwrap_err().code(), "validation_error");
        assert_eq!(
            ranker.rank(1, 5, f64::NAN).unwrap_err().code(),
            "validation_error"
        );
    }

    #[test]
    fn test_personalized_order() {
        let model = model();
        let ranker = Ranker::new(&model, RatingRange::default());

        let list = ranker.rank(1, 10, 0.0).unwrap();
        assert_eq!(list.item_ids(), vec![10, 11, 12]);
        assert_eq!(list.items[0].score, 1.0);
        assert_eq!(list.items[2].score, 0.0);
        assert!(!list.cold_start);
    }

    #[test]
    fn test_fairness_order() {
        let model = model();
        let ranker = Ranker::new(&model, RatingRange::default());

        // popularity: 10 -> 2, 11 -> 1, 12 -> 0
        let list = ranker.rank(1, 10, 100.0).unwrap();
        assert_eq!(list.item_ids(), vec![12, 11, 10]);
    }

    #[test]
    fn test_truncates_to_top_n() {
        let model = model();
        let ranker = Ranker::new(&model, RatingRange::default());

        let list = ranker.rank(1, 2, 50.0).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.snapshot_id, model.snapshot_id());
    }

    #[test]
    fn test_history_without_factors_is_unknown() {
        let model = model();
        let ranker = Ranker::new(&model, RatingRange::default());

        assert_eq!(ranker.rank(2, 5, 0.0).unwrap_err(), EngineError::UnknownUser(2));
    }

    #[test]
    fn test_cold_items_are_skipped() {
        let model = model();
        let ranker = Ranker::new(&model, RatingRange::default());

        let candidates = BTreeSet::from([10, 404, 12]);
        let list = ranker.rank_candidates(1, &candidates, 10, 0.0).unwrap();
        assert_eq!(list.item_ids(), vec![10, 12]);
    }

    #[test]
    fn test_fallback_ranks_population() {
        let model = model();
        let ranker = Ranker::new(&model, RatingRange::default());

        let list = ranker.rank_fallback(99999, 10, 0.0).unwrap();
        assert!(list.cold_start);
        assert_eq!(list.len(), 4);
        // equal baselines: flat 0.5 scores, ties broken by item id
        assert_eq!(list.item_ids(), vec![10, 11, 12, 13]);
    }
}
