//! Background job system for signal ingestion and alert evaluation

pub mod context;
pub mod handlers;
pub mod types;

pub use context::JobContext;
pub use types::{EvaluateAlertsJob, UpdateCrimeJob, UpdatePriceBatchJob, UpdateWeatherJob};
