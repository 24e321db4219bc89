//! Fairness-aware movie recommendation engine
//!
//! Serves top-N recommendations and explanations from an immutable biased
//! matrix factorization snapshot (`global_mean + b_u + b_i + p_u · q_i`),
//! with a client-tunable trade-off between personalization and an
//! inverse-popularity fairness signal.
//!
//! Snapshots are trained offline, loaded whole, and swapped atomically behind
//! a `ModelHandle`; requests never observe a partially loaded model.

pub mod candidates;
pub mod catalog;
pub mod cold_start;
pub mod config;
pub mod dataset;
pub mod error;
pub mod explanation;
pub mod fairness;
pub mod feedback;
pub mod handle;
pub mod loader;
pub mod model;
pub mod observability;
pub mod prediction;
pub mod ranker;
pub mod service;
pub mod types;
pub mod watcher;

// Re-export key types
pub use candidates::CandidateGenerator;
pub use catalog::{Catalog, Movie, MovieCatalog, MOVIELENS_GENRES};
pub use cold_start::{ColdStartPolicy, HandleColdStartUser};
pub use config::{ConfigError, FeedbackBackend, RecommenderConfig};
pub use dataset::{parse_ratings, read_ratings, RatingRecord};
pub use error::{EngineError, EngineResult, LoadError};
pub use explanation::{Contributions, Explanation, ExplanationEngine};
pub use fairness::{FairnessAudit, FairnessReport, FairnessScorer};
pub use feedback::{
    ExplanationRef, FeedbackAck, FeedbackCollector, FeedbackRecord, FeedbackStore,
    InMemoryFeedbackStore, JsonLinesFeedbackStore, PostgresFeedbackStore,
};
pub use handle::ModelHandle;
pub use loader::{FactorRecord, SnapshotFile, SnapshotLoader, SNAPSHOT_FORMAT_VERSION};
pub use model::{FactorModel, FactorModelBuilder, SnapshotMetadata};
pub use observability::{init_logging, LogFormat};
pub use prediction::{Estimate, PredictionEngine};
pub use ranker::Ranker;
pub use service::{ExplanationResponse, Readiness, RecommendationService};
pub use types::*;
pub use watcher::SnapshotWatcher;

#[cfg(test)]
mod tests;
