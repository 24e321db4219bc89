//! Cold Start Handling
//!
//! Decides what an unknown user gets instead of a personalized list.
//!
//! Steps:
//! 1. Check whether the user is truly cold (no trained factors)
//! 2. Under `Reject`, surface `UnknownUser`
//! 3. Under `PopularityFallback`, rank every known item by its non-personalized
//!    baseline with the usual fairness blend, flagged `cold_start`

use crate::error::{EngineError, EngineResult};
use crate::model::FactorModel;
use crate::ranker::Ranker;
use crate::types::{RatingRange, RecommendationList, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColdStartPolicy {
    Reject,
    #[default]
    PopularityFallback,
}

impl ColdStartPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColdStartPolicy::Reject => "reject",
            ColdStartPolicy::PopularityFallback => "popularity_fallback",
        }
    }
}

pub struct HandleColdStartUser;

impl HandleColdStartUser {
    /// True when the model cannot personalize for this user
    pub fn is_cold(model: &FactorModel, user_id: UserId) -> bool {
        !model.knows_user(user_id)
    }

    /// Only call once `is_cold` holds; warm users go through `Ranker::rank`.
    pub fn execute(
        model: &FactorModel,
        range: RatingRange,
        policy: ColdStartPolicy,
        user_id: UserId,
        top_n: usize,
        fairness_preference: f64,
    ) -> EngineResult<RecommendationList> {
        match policy {
            ColdStartPolicy::Reject => Err(EngineError::UnknownUser(user_id)),
            ColdStartPolicy::PopularityFallback => {
                tracing::info!(
                    user_id,
                    history = model.rated_items(user_id).len(),
                    "Serving popularity fallback to cold-start user"
                );
                Ranker::new(model, range).rank_fallback(user_id, top_n, fairness_preference)
            }
        }
    }
}
