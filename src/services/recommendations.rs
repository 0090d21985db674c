//! Similarity-based destination ranking
//!
//! The similarity artifact is a single shared cache entry with a 24h
//! freshness window; concurrent recomputation is tolerated (last writer
//! wins, the content is deterministic for the same underlying data).

use crate::cache::SignalCache;
use crate::config;
use crate::db::TravelStore;
use crate::metrics::Metrics;
use crate::services::similarity::{rank_candidates, SimilarityArtifact};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cache key for the single global similarity artifact
pub const SIMILARITY_CACHE_KEY: &str = "destination_similarity";

/// Discovery ranking only considers weather snapshots this recent
pub const DISCOVER_WINDOW_DAYS: i64 = 7;

/// One ranked destination, annotated with whichever score produced the
/// ranking (similarity percent for personalized, 0-100 weather score for
/// discovery) and its latest prices.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub id: i64,
    pub name: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotel_price: Option<f64>,
}

pub struct RecommendationEngine {
    store: Arc<TravelStore>,
    cache: Arc<dyn SignalCache>,
    metrics: Option<Arc<Metrics>>,
}

impl RecommendationEngine {
    pub fn new(store: Arc<TravelStore>, cache: Arc<dyn SignalCache>) -> Self {
        Self {
            store,
            cache,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Read the cached similarity artifact, recomputing when it is absent,
    /// stale, or unparseable.
    pub async fn load_or_compute_artifact(
        &self,
    ) -> Result<SimilarityArtifact, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(raw) = self.cache.get(SIMILARITY_CACHE_KEY).await {
            match serde_json::from_str::<SimilarityArtifact>(&raw) {
                Ok(artifact)
                    if artifact.is_fresh(Utc::now(), config::SIMILARITY_CACHE_TTL_SECS) =>
                {
                    debug!(
                        destinations = artifact.destination_ids.len(),
                        "Using cached similarity matrix"
                    );
                    return Ok(artifact);
                }
                Ok(_) => {
                    debug!("Cached similarity matrix is stale, recomputing");
                }
                Err(e) => {
                    warn!(error = %e, "Cached similarity matrix unparseable, recomputing");
                }
            }
        }

        self.compute_artifact().await
    }

    /// Rebuild the similarity artifact from the latest snapshots and cache it
    pub async fn compute_artifact(
        &self,
    ) -> Result<SimilarityArtifact, Box<dyn std::error::Error + Send + Sync>> {
        let inputs = self.store.feature_inputs().await?;
        let artifact = SimilarityArtifact::build(&inputs);

        if let Some(ref metrics) = self.metrics {
            metrics.similarity_rebuilds_total.inc();
        }
        info!(
            destinations = artifact.destination_ids.len(),
            "Computed destination similarity matrix"
        );

        match serde_json::to_string(&artifact) {
            Ok(json) => {
                self.cache
                    .set(SIMILARITY_CACHE_KEY, &json, config::SIMILARITY_CACHE_TTL_SECS)
                    .await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to serialize similarity artifact for caching");
            }
        }

        Ok(artifact)
    }

    /// Personalized ranking for a user's favorites.
    ///
    /// Candidates never include the favorites themselves; a user with no
    /// favorites falls back to the discovery ranking. An unknown user gets
    /// an empty list.
    pub async fn personalized(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<Recommendation>, Box<dyn std::error::Error + Send + Sync>> {
        if !self.store.user_exists(user_id).await? {
            warn!(user_id, "Recommendations requested for unknown user");
            return Ok(Vec::new());
        }

        let favorite_ids = self.store.favorite_destination_ids(user_id).await?;
        if favorite_ids.is_empty() {
            debug!(user_id, "User has no favorites, falling back to discovery");
            return self.discover(limit).await;
        }

        let artifact = self.load_or_compute_artifact().await?;
        let ranked = rank_candidates(&artifact, &favorite_ids, limit);
        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = ranked.iter().map(|(id, _)| *id).collect();
        let destinations = self.store.get_destinations_by_ids(&ids).await?;
        let by_id: HashMap<i64, _> = destinations.into_iter().map(|d| (d.id, d)).collect();

        let mut recommendations = Vec::with_capacity(ranked.len());
        for (dest_id, similarity) in ranked {
            let Some(destination) = by_id.get(&dest_id) else {
                continue;
            };
            let price = self.store.latest_price(dest_id).await?;
            recommendations.push(Recommendation {
                id: destination.id,
                name: destination.name.clone(),
                country: destination.country.clone(),
                description: destination.description.clone(),
                similarity_score: Some((similarity * 100.0).round()),
                weather_score: None,
                flight_price: price.as_ref().map(|p| p.flight_price),
                hotel_price: price.as_ref().map(|p| p.hotel_price),
            });
        }

        Ok(recommendations)
    }

    /// Destination discovery: best recent weather first, latest prices
    /// attached. Weather snapshots older than the window are ignored.
    pub async fn discover(
        &self,
        limit: usize,
    ) -> Result<Vec<Recommendation>, Box<dyn std::error::Error + Send + Sync>> {
        let since = Utc::now() - Duration::days(DISCOVER_WINDOW_DAYS);
        let ranked = self.store.top_by_weather(since, limit).await?;

        Ok(ranked
            .into_iter()
            .map(|row| Recommendation {
                id: row.destination.id,
                name: row.destination.name,
                country: row.destination.country,
                description: row.destination.description,
                similarity_score: None,
                weather_score: Some((row.weather_score * 10.0).round()),
                flight_price: Some(row.flight_price),
                hotel_price: Some(row.hotel_price),
            })
            .collect())
    }
}
