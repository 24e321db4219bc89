//! Explanation Engine
//!
//! Decomposes a prediction into a user-side and a movie-side contribution, or
//! summarizes it in plain language.
//!
//! Decomposition convention (sum-preserving):
//!
//! ```text
//! shared = (global_mean + p_u · q_i + clamp_adjustment) / 2
//! user_contribution  = shared + b_u
//! movie_contribution = shared + b_i
//! ```
//!
//! where `clamp_adjustment = predict(u, i) - raw_prediction`. The two
//! contributions therefore always add up to the clamped prediction.

use crate::catalog::Catalog;
use crate::error::{EngineError, EngineResult};
use crate::model::FactorModel;
use crate::prediction::PredictionEngine;
use crate::types::{DetailLevel, ItemId, RatingRange, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Ratings at or above this count as "liked" for simple explanations
pub const DEFAULT_LIKED_THRESHOLD: f64 = 4.0;

const MAX_SIMPLE_REFERENCES: usize = 3;

/// Explanation for one (user, item) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Explanation {
    Simple {
        interpretation: String,
    },
    Detailed {
        user_contribution: f64,
        movie_contribution: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        convergence_delta: Option<f64>,
        interpretation: String,
    },
    Unavailable {
        error: String,
    },
}

impl Explanation {
    pub fn is_available(&self) -> bool {
        !matches!(self, Explanation::Unavailable { .. })
    }
}

/// Sum-preserving split of a prediction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contributions {
    pub prediction: f64,
    pub user_contribution: f64,
    pub movie_contribution: f64,
}

pub struct ExplanationEngine<'a> {
    model: &'a FactorModel,
    predictor: PredictionEngine<'a>,
    catalog: &'a dyn Catalog,
    liked_threshold: f64,
}

impl<'a> ExplanationEngine<'a> {
    pub fn new(model: &'a FactorModel, range: RatingRange, catalog: &'a dyn Catalog) -> Self {
        Self {
            model,
            predictor: PredictionEngine::new(model, range),
            catalog,
            liked_threshold: DEFAULT_LIKED_THRESHOLD,
        }
    }

    pub fn with_liked_threshold(mut self, threshold: f64) -> Self {
        self.liked_threshold = threshold;
        self
    }

    /// Explain with a textual detail level.
    ///
    /// An unrecognized level is a `Validation` error. A failed prediction is
    /// not an error: it yields `Explanation::Unavailable`.
    pub fn explain(
        &self,
        user_id: UserId,
        item_id: ItemId,
        detail_level: &str,
    ) -> EngineResult<Explanation> {
        let level: DetailLevel = detail_level.parse()?;
        Ok(self.explain_level(user_id, item_id, level))
    }

    pub fn explain_level(&self, user_id: UserId, item_id: ItemId, level: DetailLevel) -> Explanation {
        let contributions = match self.contributions(user_id, item_id) {
            Ok(c) => c,
            Err(err) => {
                tracing::debug!(user_id, item_id, error = %err, "Explanation unavailable");
                return Explanation::Unavailable {
                    error: unavailable_reason(&err),
                };
            }
        };

        match level {
            DetailLevel::Simple => Explanation::Simple {
                interpretation: self.interpret_simple(user_id, item_id),
            },
            DetailLevel::Detailed => Explanation::Detailed {
                user_contribution: contributions.user_contribution,
                movie_contribution: contributions.movie_contribution,
                convergence_delta: self.model.metadata().convergence_delta,
                interpretation: interpret_detailed(&contributions),
            },
        }
    }

    pub fn contributions(&self, user_id: UserId, item_id: ItemId) -> EngineResult<Contributions> {
        let terms = self.predictor.terms(user_id, item_id)?;
        let raw = terms.raw();
        let prediction = self.predictor.range().clamp(raw);
        let clamp_adjustment = prediction - raw;

        let shared = (terms.global_mean + terms.interaction + clamp_adjustment) / 2.0;

        Ok(Contributions {
            prediction,
            user_contribution: shared + terms.user_bias,
            movie_contribution: shared + terms.item_bias,
        })
    }

    fn interpret_simple(&self, user_id: UserId, item_id: ItemId) -> String {
        let target_title = self.display_title(item_id);
        let empty = BTreeSet::new();
        let target_genres = self.catalog.genres(item_id).unwrap_or(&empty);

        let mut liked: Vec<(ItemId, f64)> = self
            .model
            .user_ratings(user_id)
            .map(|ratings| {
                ratings
                    .iter()
                    .filter(|(id, rating)| **id != item_id && **rating >= self.liked_threshold)
                    .map(|(&id, &rating)| (id, rating))
                    .collect()
            })
            .unwrap_or_default();
        liked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let sentences: Vec<String> = liked
            .into_iter()
            .filter_map(|(id, _)| {
                let genres = self.catalog.genres(id)?;
                let common: Vec<&str> = target_genres
                    .intersection(genres)
                    .map(String::as_str)
                    .collect();
                if common.is_empty() {
                    return None;
                }
                Some(format!(
                    "You liked '{}', which shares the genres ({}) with '{}'.",
                    self.display_title(id),
                    common.join(", "),
                    target_title
                ))
            })
            .take(MAX_SIMPLE_REFERENCES)
            .collect();

        if sentences.is_empty() {
            format!(
                "'{}' is recommended based on its unique attributes and overall popularity among similar users.",
                target_title
            )
        } else {
            sentences.join(" ")
        }
    }

    fn display_title(&self, item_id: ItemId) -> String {
        self.catalog
            .title(item_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("item {}", item_id))
    }
}

fn interpret_detailed(c: &Contributions) -> String {
    let balance = if (c.user_contribution - c.movie_contribution).abs() < 0.05 {
        "Your preferences and the movie's general appeal weigh about equally."
    } else if c.user_contribution > c.movie_contribution {
        "Your personal rating tendencies weigh more than the movie's general appeal."
    } else {
        "The movie's general appeal weighs more than your personal rating tendencies."
    };
    format!(
        "Predicted rating {:.2}: {:.2} comes from your tastes and {:.2} from this movie's profile. {}",
        c.prediction, c.user_contribution, c.movie_contribution, balance
    )
}

fn unavailable_reason(err: &EngineError) -> String {
    match err {
        EngineError::UnknownUser(_) => "cold start: no data for this user".to_string(),
        EngineError::UnknownItem(_) => "cold start: no data for this item".to_string(),
        other => EngineError::ExplanationUnavailable(other.to_string()).to_string(),
    }
}
