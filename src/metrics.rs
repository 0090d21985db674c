//! Prometheus metrics for the ingestion and alerting pipeline

use prometheus::{Encoder, Gauge, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,

    pub signal_fetches_total: IntCounter,
    pub cache_hits_total: IntCounter,
    pub cache_misses_total: IntCounter,
    pub provider_failures_total: IntCounter,
    pub fetch_duration_seconds: Histogram,

    pub alerts_fired_total: IntCounter,
    pub notification_failures_total: IntCounter,
    pub similarity_rebuilds_total: IntCounter,

    pub database_connected: Gauge,
    pub cache_connected: Gauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let signal_fetches_total = IntCounter::with_opts(Opts::new(
            "signal_fetches_total",
            "Total signal fetch operations (cached and fresh)",
        ))?;
        let cache_hits_total = IntCounter::with_opts(Opts::new(
            "cache_hits_total",
            "Signal fetches served from the cache",
        ))?;
        let cache_misses_total = IntCounter::with_opts(Opts::new(
            "cache_misses_total",
            "Signal fetches that went to an external provider",
        ))?;
        let provider_failures_total = IntCounter::with_opts(Opts::new(
            "provider_failures_total",
            "External provider calls that failed and fell back to defaults",
        ))?;
        let fetch_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "fetch_duration_seconds",
            "Duration of signal fetch operations",
        ))?;
        let alerts_fired_total = IntCounter::with_opts(Opts::new(
            "alerts_fired_total",
            "Price-drop alerts that fired",
        ))?;
        let notification_failures_total = IntCounter::with_opts(Opts::new(
            "notification_failures_total",
            "Per-channel notification sends that failed",
        ))?;
        let similarity_rebuilds_total = IntCounter::with_opts(Opts::new(
            "similarity_rebuilds_total",
            "Similarity matrix recomputations",
        ))?;
        let database_connected = Gauge::with_opts(Opts::new(
            "database_connected",
            "1 when the snapshot store connection is up",
        ))?;
        let cache_connected = Gauge::with_opts(Opts::new(
            "cache_connected",
            "1 when the Redis cache connection is up",
        ))?;

        registry.register(Box::new(signal_fetches_total.clone()))?;
        registry.register(Box::new(cache_hits_total.clone()))?;
        registry.register(Box::new(cache_misses_total.clone()))?;
        registry.register(Box::new(provider_failures_total.clone()))?;
        registry.register(Box::new(fetch_duration_seconds.clone()))?;
        registry.register(Box::new(alerts_fired_total.clone()))?;
        registry.register(Box::new(notification_failures_total.clone()))?;
        registry.register(Box::new(similarity_rebuilds_total.clone()))?;
        registry.register(Box::new(database_connected.clone()))?;
        registry.register(Box::new(cache_connected.clone()))?;

        Ok(Self {
            registry,
            signal_fetches_total,
            cache_hits_total,
            cache_misses_total,
            provider_failures_total,
            fetch_duration_seconds,
            alerts_fired_total,
            notification_failures_total,
            similarity_rebuilds_total,
            database_connected,
            cache_connected,
        })
    }

    /// Render all registered series in the Prometheus text format
    pub fn export(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| {
                Box::new(std::io::Error::other(format!(
                    "Failed to encode metrics: {}",
                    e
                ))) as Box<dyn std::error::Error + Send + Sync>
            })?;
        String::from_utf8(buffer).map_err(|e| {
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Metrics output was not UTF-8: {}", e),
            )) as Box<dyn std::error::Error + Send + Sync>
        })
    }
}
