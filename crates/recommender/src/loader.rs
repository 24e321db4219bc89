//! Snapshot persistence and loading
//!
//! The offline training job writes the factor parameters as a bincode-encoded
//! `SnapshotFile`. The rating dataset is read separately and supplies the
//! rated-items sets and popularity counts. Both are combined into one
//! `FactorModel` through the validating builder, so a load either yields a
//! complete snapshot or an error.

use crate::dataset::read_ratings;
use crate::error::LoadError;
use crate::model::{FactorModel, FactorModelBuilder};
use crate::types::{ItemId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Trained parameters for one user or item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorRecord<Id> {
    pub id: Id,
    pub bias: f64,
    pub factors: Vec<f64>,
}

/// On-disk factor snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub format_version: u32,
    pub dim: usize,
    pub global_mean: f64,
    pub users: Vec<FactorRecord<UserId>>,
    pub items: Vec<FactorRecord<ItemId>>,
    pub trained_at: Option<DateTime<Utc>>,
    pub training_rmse: Option<f64>,
    pub convergence_delta: Option<f64>,
}

impl SnapshotFile {
    pub fn to_bytes(&self) -> Result<Vec<u8>, LoadError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        let file: SnapshotFile = bincode::deserialize(bytes)?;
        if file.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(LoadError::UnsupportedFormat {
                found: file.format_version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }
        Ok(file)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), LoadError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes).map_err(|e| LoadError::io(path, e))
    }

    /// Start a builder seeded with these parameters
    pub fn into_builder(self) -> FactorModelBuilder {
        let mut builder = FactorModelBuilder::new(self.dim)
            .global_mean(self.global_mean)
            .trained_at(self.trained_at)
            .training_rmse(self.training_rmse)
            .convergence_delta(self.convergence_delta);

        for user in self.users {
            builder = builder.user(user.id, user.bias, user.factors);
        }
        for item in self.items {
            builder = builder.item(item.id, item.bias, item.factors);
        }
        builder
    }
}

/// Loads snapshots from a factor file plus a ratings file
#[derive(Debug, Clone)]
pub struct SnapshotLoader {
    factors_path: PathBuf,
    ratings_path: PathBuf,
}

impl SnapshotLoader {
    pub fn new(factors_path: impl Into<PathBuf>, ratings_path: impl Into<PathBuf>) -> Self {
        Self {
            factors_path: factors_path.into(),
            ratings_path: ratings_path.into(),
        }
    }

    pub fn factors_path(&self) -> &Path {
        &self.factors_path
    }

    pub fn ratings_path(&self) -> &Path {
        &self.ratings_path
    }

    pub fn load(&self) -> Result<FactorModel, LoadError> {
        let start = Instant::now();

        let bytes =
            std::fs::read(&self.factors_path).map_err(|e| LoadError::io(&self.factors_path, e))?;
        let file = SnapshotFile::from_bytes(&bytes)?;
        let ratings = read_ratings(&self.ratings_path)?;

        let model = file
            .into_builder()
            .ratings(ratings.iter().map(|r| r.as_triple()))
            .build()?;

        tracing::info!(
            snapshot_id = %model.snapshot_id(),
            dim = model.dim(),
            users = model.user_count(),
            items = model.item_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded factor model snapshot"
        );

        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_file() -> SnapshotFile {
        SnapshotFile {
            format_version: SNAPSHOT_FORMAT_VERSION,
            dim: 2,
            global_mean: 3.0,
            users: vec![FactorRecord {
                id: 1,
                bias: 0.2,
                factors: vec![1.0, 0.0],
            }],
            items: vec![
                FactorRecord {
                    id: 10,
                    bias: -0.1,
                    factors: vec![0.5, 2.0],
                },
                FactorRecord {
                    id: 12,
                    bias: 0.0,
                    factors: vec![0.0, 0.0],
                },
            ],
            trained_at: None,
            training_rmse: Some(0.93),
            convergence_delta: Some(0.0004),
        }
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let factors_path = dir.path().join("model.bin");
        let ratings_path = dir.path().join("u.data");

        sample_file().write_to(&factors_path).unwrap();
        let mut ratings = std::fs::File::create(&ratings_path).unwrap();
        writeln!(ratings, "1\t10\t4\t881250949").unwrap();
        writeln!(ratings, "2\t10\t5\t881250950").unwrap();

        let model = SnapshotLoader::new(&factors_path, &ratings_path)
            .load()
            .unwrap();

        assert_eq!(model.dim(), 2);
        assert!(model.knows_user(1));
        assert!(model.knows_item(12));
        assert_eq!(model.item_popularity(10), 2);
        assert_eq!(model.metadata().convergence_delta, Some(0.0004));
        assert_eq!(model.metadata().training_rmse, Some(0.93));
    }

    #[test]
    fn test_unsupported_format_rejected() {
        let mut file = sample_file();
        file.format_version = 99;
        let bytes = bincode::serialize(&file).unwrap();

        let err = SnapshotFile::from_bytes(&bytes).unwrap_err();
        assert!(matches!(
            err,
            LoadError::UnsupportedFormat {
                found: 99,
                expected: SNAPSHOT_FORMAT_VERSION
            }
        ));
    }

    #[test]
    fn test_truncated_blob_rejected() {
        let bytes = sample_file().to_bytes().unwrap();
        let err = SnapshotFile::from_bytes(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, LoadError::Decode(_)));
    }

    #[test]
    fn test_missing_ratings_file_fails_whole_load() {
        let dir = tempfile::tempdir().unwrap();
        let factors_path = dir.path().join("model.bin");
        sample_file().write_to(&factors_path).unwrap();

        let result = SnapshotLoader::new(&factors_path, dir.path().join("missing.data")).load();
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }
}
