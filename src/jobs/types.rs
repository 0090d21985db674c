//! Job types for the ingestion and alerting workflow

use serde::{Deserialize, Serialize};

/// Refresh weather for one destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateWeatherJob {
    pub destination_id: i64,
}

/// Refresh crime/safety indices for one destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCrimeJob {
    pub destination_id: i64,
}

/// Refresh prices for one scheduler chunk of destinations; all fresh
/// snapshots are committed in a single transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePriceBatchJob {
    pub destination_ids: Vec<i64>,
}

/// Evaluate alert preferences for a destination after a new price snapshot.
/// Deferred to its own job so the batch write transaction never
/// intertwines with notification I/O.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateAlertsJob {
    pub destination_id: i64,
    pub new_price: f64,
}
