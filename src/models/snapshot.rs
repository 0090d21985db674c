//! Append-only signal snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tracked external signal kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Price,
    Weather,
    Crime,
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalType::Price => write!(f, "price"),
            SignalType::Weather => write!(f, "weather"),
            SignalType::Crime => write!(f, "crime"),
        }
    }
}

/// One flight/hotel price observation for a destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub destination_id: i64,
    pub flight_price: f64,
    pub hotel_price: f64,
    pub timestamp: DateTime<Utc>,
}

impl PriceSnapshot {
    pub fn new(destination_id: i64, flight_price: f64, hotel_price: f64) -> Self {
        Self {
            destination_id,
            flight_price,
            hotel_price,
            timestamp: Utc::now(),
        }
    }
}

/// One weather observation, with its derived score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub destination_id: i64,
    pub temperature: f64,
    pub condition: String,
    pub weather_score: f64,
    pub timestamp: DateTime<Utc>,
}

impl WeatherSnapshot {
    pub fn new(destination_id: i64, temperature: f64, condition: String, weather_score: f64) -> Self {
        Self {
            destination_id,
            temperature,
            condition,
            weather_score,
            timestamp: Utc::now(),
        }
    }
}

/// One crime/safety index observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrimeSnapshot {
    pub destination_id: i64,
    pub crime_index: f64,
    pub safety_index: f64,
    pub timestamp: DateTime<Utc>,
}

impl CrimeSnapshot {
    pub fn new(destination_id: i64, crime_index: f64, safety_index: f64) -> Self {
        Self {
            destination_id,
            crime_index,
            safety_index,
            timestamp: Utc::now(),
        }
    }
}

/// Unified snapshot for the enum-dispatched snapshot-store surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "lowercase")]
pub enum Snapshot {
    Price(PriceSnapshot),
    Weather(WeatherSnapshot),
    Crime(CrimeSnapshot),
}

impl Snapshot {
    pub fn signal_type(&self) -> SignalType {
        match self {
            Snapshot::Price(_) => SignalType::Price,
            Snapshot::Weather(_) => SignalType::Weather,
            Snapshot::Crime(_) => SignalType::Crime,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Snapshot::Price(s) => s.timestamp,
            Snapshot::Weather(s) => s.timestamp,
            Snapshot::Crime(s) => s.timestamp,
        }
    }
}
