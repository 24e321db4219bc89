//! Fairness signal and list-level fairness audit
//!
//! The fairness signal is inverse popularity: `1 - count(i) / max_count`,
//! where `count(i)` is how many users rated item `i` in the training data.
//! Never-rated items score 1.0, the most-rated item scores 0.0. It is a
//! property of the catalog and does not depend on the requesting user.

use crate::catalog::Catalog;
use crate::model::FactorModel;
use crate::types::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Score assigned to every value of a zero-variance set
pub const FLAT_NORMALIZED_SCORE: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct FairnessScorer<'a> {
    model: &'a FactorModel,
}

impl<'a> FairnessScorer<'a> {
    pub fn new(model: &'a FactorModel) -> Self {
        Self { model }
    }

    /// Inverse popularity in [0, 1]; higher means less popular
    pub fn score(&self, item_id: ItemId) -> f64 {
        let max = self.model.max_popularity();
        if max == 0 {
            return 1.0;
        }
        1.0 - self.model.item_popularity(item_id) as f64 / max as f64
    }
}

/// Weight applied to the fairness term for a preference in [0, 100]
pub fn blend_weight(fairness_preference: f64) -> f64 {
    (fairness_preference / 100.0).clamp(0.0, 1.0)
}

/// `(1 - w) * personalized + w * fairness`
pub fn blend(norm_predicted: f64, norm_fairness: f64, weight: f64) -> f64 {
    (1.0 - weight) * norm_predicted + weight * norm_fairness
}

/// Min-max normalize into [0, 1]; a zero-variance set maps to 0.5 everywhere
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let spread = max - min;

    if spread.is_nan() || spread <= 0.0 {
        return vec![FLAT_NORMALIZED_SCORE; values.len()];
    }
    values.iter().map(|v| (v - min) / spread).collect()
}

/// Fairness metrics for one recommendation list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessReport {
    /// Mean popularity of recommended items over mean popularity of all rated items
    pub popularity_bias: f64,
    /// Mean number of distinct genres per recommended item
    pub genre_diversity: f64,
    /// Distinct genres across the whole list
    pub distinct_genres: usize,
    /// Recommended items over items known to the model
    pub catalog_coverage: f64,
    /// Coefficient of variation (sample std / mean) of the rated recommended
    /// items' popularity; 0 when fewer than two are rated
    pub exposure_fairness: f64,
    pub item_count: usize,
}

pub struct FairnessAudit;

impl FairnessAudit {
    pub fn evaluate(items: &[ItemId], model: &FactorModel, catalog: &dyn Catalog) -> FairnessReport {
        let rated: Vec<f64> = items
            .iter()
            .map(|&id| model.item_popularity(id))
            .filter(|&count| count > 0)
            .map(f64::from)
            .collect();
        let overall = model.mean_popularity();
        let popularity_bias = if rated.is_empty() || overall == 0.0 {
            0.0
        } else {
            (rated.iter().sum::<f64>() / rated.len() as f64) / overall
        };
        let exposure_fairness = coefficient_of_variation(&rated);

        let mut all_genres = HashSet::new();
        let mut genre_counts = Vec::new();
        for genres in items.iter().filter_map(|&id| catalog.genres(id)) {
            genre_counts.push(genres.len() as f64);
            all_genres.extend(genres.iter().cloned());
        }
        let genre_diversity = if genre_counts.is_empty() {
            0.0
        } else {
            genre_counts.iter().sum::<f64>() / genre_counts.len() as f64
        };

        let distinct_items: HashSet<ItemId> = items.iter().copied().collect();
        let catalog_coverage = if model.item_count() == 0 {
            0.0
        } else {
            distinct_items.len() as f64 / model.item_count() as f64
        };

        let report = FairnessReport {
            popularity_bias,
            genre_diversity,
            distinct_genres: all_genres.len(),
            catalog_coverage,
            exposure_fairness,
            item_count: items.len(),
        };
        tracing::debug!(?report, "Fairness audit computed");
        report
    }
}

/// Sample (n - 1) standard deviation over the mean
fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt() / mean
}
