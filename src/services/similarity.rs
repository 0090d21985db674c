//! Destination similarity: feature matrix, normalization, and the cached
//! similarity artifact
//!
//! Everything here is pure; the recommendation engine supplies the inputs
//! and owns the cache round-trip.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Defaults substituted when a destination has no snapshot of a signal yet
pub const DEFAULT_TEMPERATURE: f64 = 25.0;
pub const DEFAULT_WEATHER_SCORE: f64 = 7.0;
pub const DEFAULT_SAFETY_INDEX: f64 = 50.0;
pub const DEFAULT_FLIGHT_PRICE: f64 = 500.0;
pub const DEFAULT_HOTEL_PRICE: f64 = 400.0;

/// Number of features per destination
pub const FEATURE_DIM: usize = 7;

/// Raw per-destination inputs, latest snapshot of each signal (None when
/// the destination has no snapshot of that signal yet)
#[derive(Debug, Clone)]
pub struct FeatureInput {
    pub destination_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub temperature: Option<f64>,
    pub weather_score: Option<f64>,
    pub safety_index: Option<f64>,
    pub flight_price: Option<f64>,
    pub hotel_price: Option<f64>,
}

impl FeatureInput {
    /// The 7-dimension feature vector with documented defaults filled in
    pub fn feature_vector(&self) -> [f64; FEATURE_DIM] {
        [
            self.latitude,
            self.longitude,
            self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            self.weather_score.unwrap_or(DEFAULT_WEATHER_SCORE),
            self.safety_index.unwrap_or(DEFAULT_SAFETY_INDEX),
            self.flight_price.unwrap_or(DEFAULT_FLIGHT_PRICE),
            self.hotel_price.unwrap_or(DEFAULT_HOTEL_PRICE),
        ]
    }
}

/// Center each column to zero mean and scale to unit variance.
///
/// Keeps any single feature from dominating the similarity computation. A
/// zero-variance column is left centered rather than divided by zero.
pub fn normalize_columns(matrix: &mut [Vec<f64>]) {
    if matrix.is_empty() {
        return;
    }
    let rows = matrix.len() as f64;
    let cols = matrix[0].len();

    for col in 0..cols {
        let mean = matrix.iter().map(|row| row[col]).sum::<f64>() / rows;
        let variance = matrix
            .iter()
            .map(|row| (row[col] - mean).powi(2))
            .sum::<f64>()
            / rows;
        let std_dev = variance.sqrt();

        for row in matrix.iter_mut() {
            row[col] -= mean;
            if std_dev > 0.0 {
                row[col] /= std_dev;
            }
        }
    }
}

/// Pairwise dot products of the (normalized) feature rows
pub fn similarity_matrix(features: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = features.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let dot: f64 = features[i]
                .iter()
                .zip(features[j].iter())
                .map(|(a, b)| a * b)
                .sum();
            matrix[i][j] = dot;
            matrix[j][i] = dot;
        }
    }
    matrix
}

/// Rescale all entries into [0, 1]; skipped when min == max to avoid
/// dividing by zero.
pub fn rescale_unit(matrix: &mut [Vec<f64>]) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for row in matrix.iter() {
        for &value in row {
            min = min.min(value);
            max = max.max(value);
        }
    }
    if max <= min {
        return;
    }
    let span = max - min;
    for row in matrix.iter_mut() {
        for value in row.iter_mut() {
            *value = (*value - min) / span;
        }
    }
}

/// The single cached similarity entry: destination ordering, the explicit
/// id-to-row mapping, the rescaled matrix, and when it was computed.
///
/// The mapping travels with the matrix as one value so row order is never
/// re-derived positionally by readers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityArtifact {
    pub destination_ids: Vec<i64>,
    pub index: HashMap<i64, usize>,
    pub matrix: Vec<Vec<f64>>,
    pub computed_at: DateTime<Utc>,
}

impl SimilarityArtifact {
    pub fn build(inputs: &[FeatureInput]) -> Self {
        let destination_ids: Vec<i64> = inputs.iter().map(|i| i.destination_id).collect();
        let index: HashMap<i64, usize> = destination_ids
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();

        let mut features: Vec<Vec<f64>> = inputs
            .iter()
            .map(|i| i.feature_vector().to_vec())
            .collect();
        normalize_columns(&mut features);

        let mut matrix = similarity_matrix(&features);
        rescale_unit(&mut matrix);

        Self {
            destination_ids,
            index,
            matrix,
            computed_at: Utc::now(),
        }
    }

    /// Whether the artifact is still inside its freshness window
    pub fn is_fresh(&self, now: DateTime<Utc>, window_secs: u64) -> bool {
        now - self.computed_at < Duration::seconds(window_secs as i64)
    }

    pub fn score(&self, a: i64, b: i64) -> Option<f64> {
        let i = *self.index.get(&a)?;
        let j = *self.index.get(&b)?;
        Some(self.matrix[i][j])
    }
}

/// Rank non-favorite candidates against a set of favorites.
///
/// A candidate's score is the maximum similarity to any single favorite: a
/// destination only needs to resemble one favorite to qualify. Output is
/// sorted by descending score (ascending id on ties, so ranking is stable)
/// and truncated to `limit`.
pub fn rank_candidates(
    artifact: &SimilarityArtifact,
    favorite_ids: &[i64],
    limit: usize,
) -> Vec<(i64, f64)> {
    let mut best: HashMap<i64, f64> = HashMap::new();

    for &fav_id in favorite_ids {
        let Some(&fav_index) = artifact.index.get(&fav_id) else {
            continue;
        };
        let scores = &artifact.matrix[fav_index];

        for (&dest_id, &dest_index) in &artifact.index {
            if favorite_ids.contains(&dest_id) {
                continue;
            }
            let similarity = scores[dest_index];
            best.entry(dest_id)
                .and_modify(|s| *s = s.max(similarity))
                .or_insert(similarity);
        }
    }

    let mut ranked: Vec<(i64, f64)> = best.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked.truncate(limit);
    ranked
}
