//! Explanation behaviour over the shared fixture

use super::{fixture_catalog, fixture_model};
use crate::explanation::{Explanation, ExplanationEngine};
use crate::model::FactorModelBuilder;
use crate::prediction::PredictionEngine;
use crate::types::{DetailLevel, RatingRange};

#[test]
fn test_reference_prediction_scenario() {
    let model = FactorModelBuilder::new(2)
        .global_mean(3.0)
        .user(1, 0.2, vec![1.0, 0.0])
        .item(10, -0.1, vec![0.5, 2.0])
        .build()
        .unwrap();
    let range = RatingRange::new(0.5, 5.0).unwrap();

    let predicted = PredictionEngine::new(&model, range).predict(1, 10).unwrap();
    assert!((predicted - 3.6).abs() < 1e-12);
}

#[test]
fn test_detailed_sums_for_every_known_pair() {
    let model = fixture_model();
    let catalog = fixture_catalog();
    let range = RatingRange::default();
    let engine = ExplanationEngine::new(&model, range, &catalog);
    let predictor = PredictionEngine::new(&model, range);

    for user_id in [1, 2, 3] {
        for &item_id in model.item_ids() {
            let predicted = predictor.predict(user_id, item_id).unwrap();
            match engine.explain_level(user_id, item_id, DetailLevel::Detailed) {
                Explanation::Detailed {
                    user_contribution,
                    movie_contribution,
                    convergence_delta,
                    ..
                } => {
                    assert!((user_contribution + movie_contribution - predicted).abs() < 1e-6);
                    assert_eq!(convergence_delta, Some(0.0004));
                }
                other => panic!("expected detailed explanation, got {other:?}"),
            }
        }
    }
}

#[test]
fn test_detailed_split_for_user_one() {
    let model = fixture_model();
    let catalog = fixture_catalog();
    let engine = ExplanationEngine::new(&model, RatingRange::default(), &catalog);

    // shared = (3.0 + 1.5) / 2
    let c = engine.contributions(1, 13).unwrap();
    assert!((c.prediction - 4.3).abs() < 1e-9);
    assert!((c.user_contribution - 2.45).abs() < 1e-9);
    assert!((c.movie_contribution - 1.85).abs() < 1e-9);
}

#[test]
fn test_simple_lists_liked_movies_by_rating() {
    let model = fixture_model();
    let catalog = fixture_catalog();
    let engine = ExplanationEngine::new(&model, RatingRange::default(), &catalog);

    let explanation = engine.explain(1, 13, "Simple").unwrap();
    assert_eq!(
        explanation,
        Explanation::Simple {
            interpretation: "You liked 'Contact (1997)', which shares the genres (Sci-Fi) with \
                'Return of the Jedi (1983)'. You liked 'Star Wars (1977)', which shares the genres \
                (Action, Adventure, Sci-Fi) with 'Return of the Jedi (1983)'."
                .to_string()
        }
    );
}

#[test]
fn test_simple_without_shared_genres() {
    let model = fixture_model();
    let catalog = fixture_catalog();
    let engine = ExplanationEngine::new(&model, RatingRange::default(), &catalog);

    match engine.explain(1, 14, "simple").unwrap() {
        Explanation::Simple { interpretation } => {
            assert!(interpretation.starts_with("'Liar Liar (1997)' is recommended"));
        }
        other => panic!("expected simple explanation, got {other:?}"),
    }
}

#[test]
fn test_raised_threshold_drops_references() {
    let model = fixture_model();
    let catalog = fixture_catalog();
    let engine = ExplanationEngine::new(&model, RatingRange::default(), &catalog)
        .with_liked_threshold(4.5);

    match engine.explain_level(1, 13, DetailLevel::Simple) {
        Explanation::Simple { interpretation } => {
            assert!(interpretation.contains("Contact (1997)"));
            assert!(!interpretation.contains("Star Wars (1977)"));
        }
        other => panic!("expected simple explanation, got {other:?}"),
    }
}

#[test]
fn test_cold_pairs_are_unavailable() {
    let model = fixture_model();
    let catalog = fixture_catalog();
    let engine = ExplanationEngine::new(&model, RatingRange::default(), &catalog);

    assert_eq!(
        engine.explain(4, 13, "detailed").unwrap(),
        Explanation::Unavailable {
            error: "cold start: no data for this user".to_string()
        }
    );
    assert_eq!(
        engine.explain(1, 404, "simple").unwrap(),
        Explanation::Unavailable {
            error: "cold start: no data for this item".to_string()
        }
    );
}

#[test]
fn test_bogus_level_is_validation_error() {
    let model = fixture_model();
    let catalog = fixture_catalog();
    let engine = ExplanationEngine::new(&model, RatingRange::default(), &catalog);

    let err = engine.explain(1, 13, "bogus").unwrap_err();
    assert_eq!(err.code(), "validation_error");
}
