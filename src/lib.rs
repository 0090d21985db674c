//! Tripwatch - travel signal tracking, recommendations, and price alerts
//!
//! Core pipeline: scheduler -> fetcher (cache-aside) -> snapshot store ->
//! alert evaluation -> notification fan-out. Independently, the
//! recommendation engine ranks destinations from a cached similarity matrix.

pub mod cache;
pub mod config;
pub mod core;
pub mod db;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
