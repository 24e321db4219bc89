//! Shared request and response types

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type UserId = u32;
pub type ItemId = u32;

/// Inclusive range predictions are clamped to.
///
/// Only constructible through `new` (or deserialization, which goes through
/// it), so `min < max` with both finite always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RatingBounds")]
pub struct RatingRange {
    min: f64,
    max: f64,
}

#[derive(Deserialize)]
struct RatingBounds {
    min: f64,
    max: f64,
}

impl TryFrom<RatingBounds> for RatingRange {
    type Error = EngineError;

    fn try_from(bounds: RatingBounds) -> EngineResult<Self> {
        Self::new(bounds.min, bounds.max)
    }
}

impl RatingRange {
    pub fn new(min: f64, max: f64) -> EngineResult<Self> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(EngineError::validation(
                "rating_range",
                format!("expected finite min < max, got [{}, {}]", min, max),
            ));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl Default for RatingRange {
    fn default() -> Self {
        Self { min: 0.5, max: 5.0 }
    }
}

/// Explanation granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Simple,
    Detailed,
}

impl DetailLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailLevel::Simple => "simple",
            DetailLevel::Detailed => "detailed",
        }
    }
}

impl FromStr for DetailLevel {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(DetailLevel::Simple),
            "detailed" => Ok(DetailLevel::Detailed),
            other => Err(EngineError::validation(
                "detail_level",
                format!("unrecognized value '{}' (expected 'simple' or 'detailed')", other),
            )),
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item_id: ItemId,
    /// Blended score in [0, 1]
    pub score: f64,
    /// Clamped rating estimate
    pub predicted_score: f64,
    /// Inverse-popularity signal in [0, 1]
    pub fairness_score: f64,
}

/// Ordered top-N result for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationList {
    pub user_id: UserId,
    pub fairness_preference: f64,
    pub items: Vec<ScoredItem>,
    pub snapshot_id: Uuid,
    /// True when built by a cold-start fallback rather than personalized scoring
    #[serde(default)]
    pub cold_start: bool,
}

impl RecommendationList {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|i| i.item_id).collect()
    }
}

/// Thumbs up / down on an explanation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackRating {
    Up,
    Down,
}

impl FeedbackRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackRating::Up => "up",
            FeedbackRating::Down => "down",
        }
    }
}

impl FromStr for FeedbackRating {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(FeedbackRating::Up),
            "down" => Ok(FeedbackRating::Down),
            other => Err(EngineError::validation(
                "rating",
                format!("unrecognized feedback rating '{}'", other),
            )),
        }
    }
}
