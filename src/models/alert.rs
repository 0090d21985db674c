//! Alert preference entity

use serde::{Deserialize, Serialize};

/// How often a user wants to hear about a destination.
///
/// Only `Immediate` preferences are evaluated on new price snapshots;
/// daily/weekly digests live outside this subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertFrequency {
    Immediate,
    Daily,
    Weekly,
}

/// Per-(user, destination) alert settings. At most one row per pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPreference {
    pub id: i64,
    pub user_id: i64,
    pub destination_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_threshold: Option<f64>,
    pub alert_email: bool,
    pub alert_sms: bool,
    pub alert_push: bool,
    pub frequency: AlertFrequency,
}

impl AlertFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertFrequency::Immediate => "immediate",
            AlertFrequency::Daily => "daily",
            AlertFrequency::Weekly => "weekly",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "daily" => AlertFrequency::Daily,
            "weekly" => AlertFrequency::Weekly,
            _ => AlertFrequency::Immediate,
        }
    }
}
