//! Snapshot load and publish semantics

use crate::error::{EngineError, LoadError};
use crate::handle::ModelHandle;
use crate::loader::{FactorRecord, SnapshotFile, SnapshotLoader, SNAPSHOT_FORMAT_VERSION};
use crate::prediction::PredictionEngine;
use crate::types::RatingRange;
use std::path::Path;
use std::sync::Arc;

fn snapshot(global_mean: f64) -> SnapshotFile {
    SnapshotFile {
        format_version: SNAPSHOT_FORMAT_VERSION,
        dim: 2,
        global_mean,
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
                id: 11,
                bias: 0.0,
                factors: vec![0.1, 0.1],
            },
        ],
        trained_at: None,
        training_rmse: Some(0.91),
        convergence_delta: Some(0.001),
    }
}

fn write_fixture(dir: &Path, global_mean: f64, ratings: &str) -> SnapshotLoader {
    let factors = dir.join("factors.bin");
    let data = dir.join("u.data");
    snapshot(global_mean).write_to(&factors).unwrap();
    std::fs::write(&data, ratings).unwrap();
    SnapshotLoader::new(factors, data)
}

#[test]
fn test_loaded_snapshot_predicts_reference_value() {
    let dir = tempfile::tempdir().unwrap();
    let loader = write_fixture(dir.path(), 3.0, "1\t11\t4\t881250949\n");

    let model = loader.load().unwrap();
    let predictor = PredictionEngine::new(&model, RatingRange::default());

    assert!((predictor.predict(1, 10).unwrap() - 3.6).abs() < 1e-12);
    assert!(model.is_rated(1, 11));
    assert_eq!(model.metadata().training_rmse, Some(0.91));
}

#[test]
fn test_in_flight_request_keeps_its_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let handle = ModelHandle::empty();
    assert_eq!(handle.current().unwrap_err(), EngineError::ModelUnavailable);

    handle.publish(write_fixture(dir.path(), 3.0, "").load().unwrap());
    let in_flight = handle.current().unwrap();

    handle.publish(write_fixture(dir.path(), 4.0, "").load().unwrap());

    assert_eq!(in_flight.global_mean(), 3.0);
    assert_eq!(handle.current().unwrap().global_mean(), 4.0);
    assert_ne!(Some(in_flight.snapshot_id()), handle.snapshot_id());
}

#[test]
fn test_failed_load_publishes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let loader = write_fixture(dir.path(), 3.0, "1\t10\t4\t881250949\n1\tten\t3\t881250950\n");

    let handle = Arc::new(ModelHandle::empty());
    match loader.load() {
        Err(LoadError::Dataset { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected dataset error, got {other:?}"),
    }
    assert!(!handle.is_loaded());
}

#[test]
fn test_concurrent_readers_during_publish() {
    let dir = tempfile::tempdir().unwrap();
    let handle = Arc::new(ModelHandle::with_model(
        write_fixture(dir.path(), 3.0, "").load().unwrap(),
    ));
    let replacement = write_fixture(dir.path(), 3.5, "").load().unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let handle = Arc::clone(&handle);
            std::thread::spawn(move || {
                for _ in 0..200 {
                    let model = handle.current().unwrap();
                    let predicted = PredictionEngine::new(&model, RatingRange::default())
                        .predict(1, 10)
                        .unwrap();
                    // either snapshot, never a mix
                    assert!((predicted - 3.6).abs() < 1e-12 || (predicted - 4.1).abs() < 1e-12);
                }
            })
        })
        .collect();

    handle.publish(replacement);
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(handle.current().unwrap().global_mean(), 3.5);
}
