//! Destination entity

use serde::{Deserialize, Serialize};

/// A travel destination tracked by the pipeline.
///
/// Immutable from the core's point of view; `airport_code` feeds the
/// flight-price provider query, the geocoordinate feeds the weather
/// provider and the similarity feature vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub id: i64,
    pub name: String,
    pub airport_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
