//! Trained Factor Model Snapshot
//!
//! Immutable parameters of a biased matrix factorization model:
//! `r(u, i) = global_mean + b_u + b_i + p_u · q_i`.
//!
//! Factors are stored row-wise in dense matrices with an id -> row index map,
//! alongside the rating-dataset facts the engine needs (observed ratings per
//! user and per-item rating counts). A `FactorModel` can only be produced by
//! `FactorModelBuilder::build`, which validates everything up front, so a
//! caller either has a complete, consistent snapshot or nothing.

use crate::error::LoadError;
use crate::types::{ItemId, UserId};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2, ArrayView1};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

/// Provenance of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotMetadata {
    /// Assigned when the snapshot is built
    pub snapshot_id: Uuid,
    pub trained_at: Option<DateTime<Utc>>,
    pub training_rmse: Option<f64>,
    /// Diagnostic recorded by the training run, surfaced in detailed explanations
    pub convergence_delta: Option<f64>,
}

/// Immutable factor model snapshot
#[derive(Debug)]
pub struct FactorModel {
    dim: usize,
    global_mean: f64,
    user_index: HashMap<UserId, usize>,
    item_index: HashMap<ItemId, usize>,
    /// [num_users x dim]
    user_factors: Array2<f64>,
    /// [num_items x dim]
    item_factors: Array2<f64>,
    user_bias: Array1<f64>,
    item_bias: Array1<f64>,
    /// Sorted ids of every item with trained factors
    item_ids: Vec<ItemId>,
    ratings: HashMap<UserId, BTreeMap<ItemId, f64>>,
    item_popularity: HashMap<ItemId, u32>,
    max_popularity: u32,
    metadata: SnapshotMetadata,
}

impl FactorModel {
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn global_mean(&self) -> f64 {
        self.global_mean
    }

    /// True when the user has trained factors
    pub fn knows_user(&self, user_id: UserId) -> bool {
        self.user_index.contains_key(&user_id)
    }

    /// True when the item has trained factors
    pub fn knows_item(&self, item_id: ItemId) -> bool {
        self.item_index.contains_key(&item_id)
    }

    /// True when the rating dataset has at least one rating by the user
    pub fn has_history(&self, user_id: UserId) -> bool {
        self.ratings.contains_key(&user_id)
    }

    pub fn user_factors(&self, user_id: UserId) -> Option<ArrayView1<'_, f64>> {
        self.user_index
            .get(&user_id)
            .map(|&row| self.user_factors.row(row))
    }

    pub fn item_factors(&self, item_id: ItemId) -> Option<ArrayView1<'_, f64>> {
        self.item_index
            .get(&item_id)
            .map(|&row| self.item_factors.row(row))
    }

    pub fn user_bias(&self, user_id: UserId) -> Option<f64> {
        self.user_index.get(&user_id).map(|&row| self.user_bias[row])
    }

    pub fn item_bias(&self, item_id: ItemId) -> Option<f64> {
        self.item_index.get(&item_id).map(|&row| self.item_bias[row])
    }

    /// Every item with trained factors, ascending
    pub fn item_ids(&self) -> &[ItemId] {
        &self.item_ids
    }

    pub fn user_count(&self) -> usize {
        self.user_index.len()
    }

    pub fn item_count(&self) -> usize {
        self.item_index.len()
    }

    /// Observed (item, rating) pairs for a user
    pub fn user_ratings(&self, user_id: UserId) -> Option<&BTreeMap<ItemId, f64>> {
        self.ratings.get(&user_id)
    }

    pub fn rated_items(&self, user_id: UserId) -> BTreeSet<ItemId> {
        self.ratings
            .get(&user_id)
            .map(|r| r.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_rated(&self, user_id: UserId, item_id: ItemId) -> bool {
        self.ratings
            .get(&user_id)
            .map_or(false, |r| r.contains_key(&item_id))
    }

    /// Number of ratings the item received in the training dataset
    pub fn item_popularity(&self, item_id: ItemId) -> u32 {
        self.item_popularity.get(&item_id).copied().unwrap_or(0)
    }

    pub fn max_popularity(&self) -> u32 {
        self.max_popularity
    }

    /// Mean rating count over items with at least one rating
    pub fn mean_popularity(&self) -> f64 {
        if self.item_popularity.is_empty() {
            return 0.0;
        }
        let total: u64 = self.item_popularity.values().map(|&c| c as u64).sum();
        total as f64 / self.item_popularity.len() as f64
    }

    pub fn metadata(&self) -> &SnapshotMetadata {
        &self.metadata
    }

    pub fn snapshot_id(&self) -> Uuid {
        self.metadata.snapshot_id
    }
}

/// Validating builder for `FactorModel`
#[derive(Debug, Clone, Default)]
pub struct FactorModelBuilder {
    dim: usize,
    global_mean: f64,
    users: Vec<(UserId, f64, Vec<f64>)>,
    items: Vec<(ItemId, f64, Vec<f64>)>,
    ratings: Vec<(UserId, ItemId, f64)>,
    trained_at: Option<DateTime<Utc>>,
    training_rmse: Option<f64>,
    convergence_delta: Option<f64>,
}

impl FactorModelBuilder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            ..Default::default()
        }
    }

    pub fn global_mean(mut self, global_mean: f64) -> Self {
        self.global_mean = global_mean;
        self
    }

    pub fn user(mut self, user_id: UserId, bias: f64, factors: Vec<f64>) -> Self {
        self.users.push((user_id, bias, factors));
        self
    }

    pub fn item(mut self, item_id: ItemId, bias: f64, factors: Vec<f64>) -> Self {
        self.items.push((item_id, bias, factors));
        self
    }

    pub fn rating(mut self, user_id: UserId, item_id: ItemId, rating: f64) -> Self {
        self.ratings.push((user_id, item_id, rating));
        self
    }

    pub fn ratings(mut self, ratings: impl IntoIterator<Item = (UserId, ItemId, f64)>) -> Self {
        self.ratings.extend(ratings);
        self
    }

    pub fn trained_at(mut self, trained_at: Option<DateTime<Utc>>) -> Self {
        self.trained_at = trained_at;
        self
    }

    pub fn training_rmse(mut self, rmse: Option<f64>) -> Self {
        self.training_rmse = rmse;
        self
    }

    pub fn convergence_delta(mut self, delta: Option<f64>) -> Self {
        self.convergence_delta = delta;
        self
    }

    /// Validate and assemble the snapshot
    pub fn build(self) -> Result<FactorModel, LoadError> {
        let dim = self.dim;
        if dim == 0 {
            return Err(invalid("latent dimension must be greater than 0"));
        }
        if !self.global_mean.is_finite() {
            return Err(invalid("global mean is not finite"));
        }

        let (user_index, user_bias, user_factors) = pack_factors("user", dim, self.users)?;
        let (item_index, item_bias, item_factors) = pack_factors("item", dim, self.items)?;

        let mut ratings: HashMap<UserId, BTreeMap<ItemId, f64>> = HashMap::new();
        for (user_id, item_id, rating) in self.ratings {
            if !rating.is_finite() {
                return Err(invalid(format!(
                    "rating for user {} item {} is not finite",
                    user_id, item_id
                )));
            }
            ratings.entry(user_id).or_default().insert(item_id, rating);
        }

        let mut item_popularity: HashMap<ItemId, u32> = HashMap::new();
        for user_ratings in ratings.values() {
            for &item_id in user_ratings.keys() {
                *item_popularity.entry(item_id).or_insert(0) += 1;
            }
        }
        let max_popularity = item_popularity.values().copied().max().unwrap_or(0);

        let mut item_ids: Vec<ItemId> = item_index.keys().copied().collect();
        item_ids.sort_unstable();

        let metadata = SnapshotMetadata {
            snapshot_id: Uuid::new_v4(),
            trained_at: self.trained_at,
            training_rmse: self.training_rmse.filter(|v| v.is_finite()),
            convergence_delta: self.convergence_delta.filter(|v| v.is_finite()),
        };

        tracing::debug!(
            dim,
            users = user_index.len(),
            items = item_index.len(),
            rated_users = ratings.len(),
            snapshot_id = %metadata.snapshot_id,
            "Factor model snapshot built"
        );

        Ok(FactorModel {
            dim,
            global_mean: self.global_mean,
            user_index,
            item_index,
            user_factors,
            item_factors,
            user_bias,
            item_bias,
            item_ids,
            ratings,
            item_popularity,
            max_popularity,
            metadata,
        })
    }
}

type PackedFactors<Id> = (HashMap<Id, usize>, Array1<f64>, Array2<f64>);

fn pack_factors<Id>(
    kind: &str,
    dim: usize,
    rows: Vec<(Id, f64, Vec<f64>)>,
) -> Result<PackedFactors<Id>, LoadError>
where
    Id: Copy + Eq + std::hash::Hash + std::fmt::Display,
{
    let mut index = HashMap::with_capacity(rows.len());
    let mut biases = Vec::with_capacity(rows.len());
    let mut flat = Vec::with_capacity(rows.len() * dim);

    for (id, bias, factors) in rows {
        if factors.len() != dim {
            return Err(invalid(format!(
                "{} {} has {} factors, expected {}",
                kind,
                id,
                factors.len(),
                dim
            )));
        }
        if !bias.is_finite() || factors.iter().any(|v| !v.is_finite()) {
            return Err(invalid(format!("{} {} has non-finite parameters", kind, id)));
        }
        if index.insert(id, biases.len()).is_some() {
            return Err(invalid(format!("duplicate {} id {}", kind, id)));
        }
        biases.push(bias);
        flat.extend(factors);
    }

    let matrix = Array2::from_shape_vec((biases.len(), dim), flat)
        .map_err(|e| invalid(format!("failed to shape {} factors: {}", kind, e)))?;

    Ok((index, Array1::from(biases), matrix))
}

fn invalid(message: impl Into<String>) -> LoadError {
    LoadError::InvalidSnapshot(message.into())
}
