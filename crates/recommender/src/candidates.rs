//! Candidate generation: every item the model knows that the user hasn't rated

use crate::error::{EngineError, EngineResult};
use crate::model::FactorModel;
use crate::types::{ItemId, UserId};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy)]
pub struct CandidateGenerator<'a> {
    model: &'a FactorModel,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(model: &'a FactorModel) -> Self {
        Self { model }
    }

    /// Items with trained factors minus the user's rated items.
    ///
    /// Fails with `UnknownUser` only when the user has neither factors nor any
    /// rating history; falling back to a population candidate set is left to
    /// the caller.
    pub fn candidates(&self, user_id: UserId) -> EngineResult<BTreeSet<ItemId>> {
        if !self.model.knows_user(user_id) && !self.model.has_history(user_id) {
            return Err(EngineError::UnknownUser(user_id));
        }

        Ok(self
            .model
            .item_ids()
            .iter()
            .copied()
            .filter(|&item_id| !self.model.is_rated(user_id, item_id))
            .collect())
    }

    /// Every item with trained factors, for callers doing population fallback
    pub fn population(&self) -> BTreeSet<ItemId> {
        self.model.item_ids().iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FactorModelBuilder;

    fn model() -> FactorModel {
        let mut builder = FactorModelBuilder::new(1)
            .global_mean(3.0)
            .user(1, 0.0, vec![1.0]);
        for item in [10, 11, 12, 13] {
            builder = builder.item(item, 0.0, vec![1.0]);
        }
        builder
            .rating(1, 10, 4.0)
            .rating(1, 11, 2.0)
            .rating(5, 12, 3.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_excludes_rated_items() {
        let model = model();
        let generator = CandidateGenerator::new(&model);

        assert_eq!(generator.candidates(1).unwrap(), BTreeSet::from([12, 13]));
    }

    #[test]
    fn test_user_with_history_but_no_factors() {
        let model = model();
        let generator = CandidateGenerator::new(&model);

        assert_eq!(
            generator.candidates(5).unwrap(),
            BTreeSet::from([10, 11, 13])
        );
    }

    #[test]
    fn test_entirely_unknown_user() {
        let model = model();
        let generator = CandidateGenerator::new(&model);

        assert_eq!(
            generator.candidates(99999).unwrap_err(),
            EngineError::UnknownUser(99999)
        );
        assert_eq!(generator.population().len(), 4);
    }
}
