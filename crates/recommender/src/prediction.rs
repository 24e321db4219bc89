//! Rating prediction over a factor snapshot

use crate::error::{EngineError, EngineResult};
use crate::model::FactorModel;
use crate::types::{ItemId, RatingRange, UserId};
use serde::Serialize;

/// Result of `predict_or_fallback`, tagged by where the number came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Estimate {
    /// Full model prediction for a known (user, item) pair
    Personalized(f64),
    /// Population baseline: global mean, plus item bias when the item is known
    Fallback(f64),
}

impl Estimate {
    pub fn value(&self) -> f64 {
        match self {
            Estimate::Personalized(v) | Estimate::Fallback(v) => *v,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Estimate::Fallback(_))
    }
}

/// Unclamped terms of a prediction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionTerms {
    pub global_mean: f64,
    pub user_bias: f64,
    pub item_bias: f64,
    pub interaction: f64,
}

impl PredictionTerms {
    pub fn raw(&self) -> f64 {
        self.global_mean + self.user_bias + self.item_bias + self.interaction
    }
}

/// Pure scoring function over one snapshot
#[derive(Debug, Clone, Copy)]
pub struct PredictionEngine<'a> {
    model: &'a FactorModel,
    range: RatingRange,
}

impl<'a> PredictionEngine<'a> {
    pub fn new(model: &'a FactorModel, range: RatingRange) -> Self {
        Self { model, range }
    }

    pub fn model(&self) -> &'a FactorModel {
        self.model
    }

    pub fn range(&self) -> RatingRange {
        self.range
    }

    /// Individual terms of `predict` before clamping
    pub fn terms(&self, user_id: UserId, item_id: ItemId) -> EngineResult<PredictionTerms> {
        let user_factors = self
            .model
            .user_factors(user_id)
            .ok_or(EngineError::UnknownUser(user_id))?;
        let item_factors = self
            .model
            .item_factors(item_id)
            .ok_or(EngineError::UnknownItem(item_id))?;

        Ok(PredictionTerms {
            global_mean: self.model.global_mean(),
            user_bias: self.model.user_bias(user_id).unwrap_or(0.0),
            item_bias: self.model.item_bias(item_id).unwrap_or(0.0),
            interaction: user_factors.dot(&item_factors),
        })
    }

    /// `global_mean + b_u + b_i + p_u · q_i`, clamped to the rating range
    pub fn predict(&self, user_id: UserId, item_id: ItemId) -> EngineResult<f64> {
        let terms = self.terms(user_id, item_id)?;
        Ok(self.range.clamp(terms.raw()))
    }

    /// Personalized prediction when possible, otherwise an explicit fallback
    pub fn predict_or_fallback(&self, user_id: UserId, item_id: ItemId) -> Estimate {
        match self.predict(user_id, item_id) {
            Ok(value) => Estimate::Personalized(value),
            Err(_) => Estimate::Fallback(self.baseline(item_id)),
        }
    }

    /// Population baseline for an item, independent of any user
    pub fn baseline(&self, item_id: ItemId) -> f64 {
        let item_bias = self.model.item_bias(item_id).unwrap_or(0.0);
        self.range.clamp(self.model.global_mean() + item_bias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FactorModelBuilder;

    fn model() -> FactorModel {
        FactorModelBuilder::new(2)
            .global_mean(3.0)
            .user(1, 0.2, vec![1.0, 0.0])
            .user(2, 1.5, vec![2.0, 2.0])
            .item(10, -0.1, vec![0.5, 2.0])
            .item(11, -2.0, vec![-1.0, -1.0])
            .build()
            .unwrap()
    }

    #[test]
    fn test_predict_known_pair() {
        let model = model();
        let engine = PredictionEngine::new(&model, RatingRange::default());

        let prediction = engine.predict(1, 10).unwrap();
        assert!((prediction - 3.6).abs() < 1e-9);
    }

    #[test]
    fn test_predict_is_clamped() {
        let model = model();
        let engine = PredictionEngine::new(&model, RatingRange::default());

        // 3.0 + 1.5 - 0.1 + (1.0 + 4.0) = 9.4
        assert_eq!(engine.predict(2, 10).unwrap(), 5.0);
        // 3.0 + 0.2 - 2.0 - 1.0 = 0.2
        assert_eq!(engine.predict(1, 11).unwrap(), 0.5);
    }

    #[test]
    fn test_unknown_ids() {
        let model = model();
        let engine = PredictionEngine::new(&model, RatingRange::default());

        assert_eq!(
            engine.predict(99999, 10).unwrap_err(),
            EngineError::UnknownUser(99999)
        );
        assert_eq!(engine.predict(1, 404).unwrap_err(), EngineError::UnknownItem(404));
    }

    #[test]
    fn test_fallback_is_explicit() {
        let model = model();
        let engine = PredictionEngine::new(&model, RatingRange::default());

        assert!(!engine.predict_or_fallback(1, 10).is_fallback());

        let unknown_user = engine.predict_or_fallback(99999, 10);
        assert!(unknown_user.is_fallback());
        assert!((unknown_user.value() - 2.9).abs() < 1e-9);

        let unknown_both = engine.predict_or_fallback(99999, 404);
        assert_eq!(unknown_both, Estimate::Fallback(3.0));
    }
}
