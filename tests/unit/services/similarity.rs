//! Unit tests for the similarity matrix pipeline

use chrono::{Duration, Utc};
use std::collections::HashMap;
use tripwatch::services::similarity::{
    normalize_columns, rank_candidates, rescale_unit, similarity_matrix, FeatureInput,
    SimilarityArtifact, DEFAULT_FLIGHT_PRICE, DEFAULT_HOTEL_PRICE, DEFAULT_SAFETY_INDEX,
    DEFAULT_TEMPERATURE, DEFAULT_WEATHER_SCORE, FEATURE_DIM,
};

fn input(id: i64, lat: f64, lon: f64) -> FeatureInput {
    FeatureInput {
        destination_id: id,
        latitude: lat,
        longitude: lon,
        temperature: Some(20.0 + id as f64),
        weather_score: Some(7.0),
        safety_index: Some(55.0),
        flight_price: Some(400.0 + 10.0 * id as f64),
        hotel_price: Some(320.0),
    }
}

#[test]
fn test_feature_vector_fills_documented_defaults() {
    let bare = FeatureInput {
        destination_id: 1,
        latitude: 38.7,
        longitude: -9.1,
        temperature: None,
        weather_score: None,
        safety_index: None,
        flight_price: None,
        hotel_price: None,
    };
    let vector = bare.feature_vector();
    assert_eq!(vector.len(), FEATURE_DIM);
    assert_eq!(vector[0], 38.7);
    assert_eq!(vector[1], -9.1);
    assert_eq!(vector[2], DEFAULT_TEMPERATURE);
    assert_eq!(vector[3], DEFAULT_WEATHER_SCORE);
    assert_eq!(vector[4], DEFAULT_SAFETY_INDEX);
    assert_eq!(vector[5], DEFAULT_FLIGHT_PRICE);
    assert_eq!(vector[6], DEFAULT_HOTEL_PRICE);
}

#[test]
fn test_normalize_columns_zero_mean_unit_variance() {
    let mut matrix = vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]];
    normalize_columns(&mut matrix);

    for col in 0..2 {
        let mean: f64 = matrix.iter().map(|row| row[col]).sum::<f64>() / 3.0;
        let variance: f64 = matrix
            .iter()
            .map(|row| (row[col] - mean).powi(2))
            .sum::<f64>()
            / 3.0;
        assert!(mean.abs() < 1e-9);
        assert!((variance - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_normalize_columns_constant_column_becomes_zero() {
    let mut matrix = vec![vec![5.0, 1.0], vec![5.0, 2.0], vec![5.0, 3.0]];
    normalize_columns(&mut matrix);
    for row in &matrix {
        assert_eq!(row[0], 0.0);
    }
}

#[test]
fn test_similarity_matrix_is_symmetric() {
    let features = vec![
        vec![1.0, 0.0, 2.0],
        vec![0.5, 1.0, -1.0],
        vec![-1.0, 2.0, 0.0],
    ];
    let matrix = similarity_matrix(&features);
    for i in 0..3 {
        for j in 0..3 {
            assert_eq!(matrix[i][j], matrix[j][i]);
        }
    }
}

#[test]
fn test_rescale_unit_bounds() {
    let mut matrix = vec![vec![-3.0, 0.0], vec![2.0, 7.0]];
    rescale_unit(&mut matrix);
    assert_eq!(matrix[0][0], 0.0);
    assert_eq!(matrix[1][1], 1.0);
    for row in &matrix {
        for &value in row {
            assert!((0.0..=1.0).contains(&value));
        }
    }
}

#[test]
fn test_rescale_unit_uniform_matrix_unchanged() {
    let mut matrix = vec![vec![4.0, 4.0], vec![4.0, 4.0]];
    rescale_unit(&mut matrix);
    assert_eq!(matrix, vec![vec![4.0, 4.0], vec![4.0, 4.0]]);
}

#[test]
fn test_artifact_build_keeps_ids_and_rows_aligned() {
    let inputs = vec![input(10, 38.0, -9.0), input(20, 48.8, 2.3), input(30, 41.9, 12.5)];
    let artifact = SimilarityArtifact::build(&inputs);

    assert_eq!(artifact.destination_ids, vec![10, 20, 30]);
    assert_eq!(artifact.matrix.len(), 3);
    for row in &artifact.matrix {
        assert_eq!(row.len(), 3);
    }
    for (position, id) in artifact.destination_ids.iter().enumerate() {
        assert_eq!(artifact.index[id], position);
    }
    assert_eq!(artifact.score(10, 20), artifact.score(20, 10));
    assert_eq!(artifact.score(10, 99), None);
}

#[test]
fn test_artifact_entries_are_rescaled_into_unit_interval() {
    let inputs = vec![input(1, 38.0, -9.0), input(2, 48.8, 2.3), input(3, 41.9, 12.5)];
    let artifact = SimilarityArtifact::build(&inputs);
    for row in &artifact.matrix {
        for &value in row {
            assert!((0.0..=1.0).contains(&value));
        }
    }
}

#[test]
fn test_artifact_survives_serialization() {
    let inputs = vec![input(1, 38.0, -9.0), input(2, 48.8, 2.3)];
    let artifact = SimilarityArtifact::build(&inputs);
    let json = serde_json::to_string(&artifact).unwrap();
    let restored: SimilarityArtifact = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.destination_ids, artifact.destination_ids);
    assert_eq!(restored.matrix, artifact.matrix);
    assert_eq!(restored.computed_at, artifact.computed_at);
}

#[test]
fn test_artifact_freshness_window() {
    let inputs = vec![input(1, 38.0, -9.0)];
    let mut artifact = SimilarityArtifact::build(&inputs);
    let now = Utc::now();
    assert!(artifact.is_fresh(now, 86400));

    artifact.computed_at = now - Duration::hours(25);
    assert!(!artifact.is_fresh(now, 86400));
}

fn hand_built_artifact() -> SimilarityArtifact {
    // ids 1..=4 mapped to rows 0..=3
    let destination_ids = vec![1, 2, 3, 4];
    let index: HashMap<i64, usize> = destination_ids
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i))
        .collect();
    let matrix = vec![
        vec![1.0, 0.2, 0.9, 0.5],
        vec![0.2, 1.0, 0.3, 0.5],
        vec![0.9, 0.3, 1.0, 0.1],
        vec![0.5, 0.5, 0.1, 1.0],
    ];
    SimilarityArtifact {
        destination_ids,
        index,
        matrix,
        computed_at: Utc::now(),
    }
}

#[test]
fn test_rank_candidates_excludes_favorites() {
    let artifact = hand_built_artifact();
    let ranked = rank_candidates(&artifact, &[1], 10);
    assert!(ranked.iter().all(|(id, _)| *id != 1));
    assert_eq!(ranked.len(), 3);
}

#[test]
fn test_rank_candidates_orders_by_similarity() {
    let artifact = hand_built_artifact();
    let ranked = rank_candidates(&artifact, &[1], 10);
    // against favorite 1: dest 3 scores 0.9, dest 4 scores 0.5, dest 2 scores 0.2
    assert_eq!(ranked[0], (3, 0.9));
    assert_eq!(ranked[1], (4, 0.5));
    assert_eq!(ranked[2], (2, 0.2));
}

#[test]
fn test_rank_candidates_takes_max_over_favorites() {
    let artifact = hand_built_artifact();
    let ranked = rank_candidates(&artifact, &[2, 3], 10);
    // dest 1: max(0.2 via 2, 0.9 via 3) = 0.9; dest 4: max(0.5, 0.1) = 0.5
    assert_eq!(ranked, vec![(1, 0.9), (4, 0.5)]);
}

#[test]
fn test_rank_candidates_ties_break_by_ascending_id() {
    let artifact = hand_built_artifact();
    let ranked = rank_candidates(&artifact, &[4], 10);
    // dest 1 and dest 2 both score 0.5 against favorite 4
    assert_eq!(ranked[0], (1, 0.5));
    assert_eq!(ranked[1], (2, 0.5));
    assert_eq!(ranked[2], (3, 0.1));
}

#[test]
fn test_rank_candidates_respects_limit() {
    let artifact = hand_built_artifact();
    let ranked = rank_candidates(&artifact, &[1], 2);
    assert_eq!(ranked.len(), 2);
}

#[test]
fn test_rank_candidates_unknown_favorite_is_ignored() {
    let artifact = hand_built_artifact();
    assert!(rank_candidates(&artifact, &[99], 10).is_empty());

    let ranked = rank_candidates(&artifact, &[99, 1], 10);
    assert_eq!(ranked.len(), 3);
}

#[test]
fn test_rank_candidates_empty_favorites_yield_nothing() {
    let artifact = hand_built_artifact();
    assert!(rank_candidates(&artifact, &[], 10).is_empty());
}
