//! Tripwatch Worker
//!
//! Processes signal ingestion and alert jobs from the Redis queue and
//! runs the batch scheduler that enqueues them on their cadences.

use apalis_redis::RedisStorage;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tripwatch::cache::RedisCache;
use tripwatch::core::runtime::IngestRuntime;
use tripwatch::core::scheduler::BatchScheduler;
use tripwatch::db::TravelStore;
use tripwatch::jobs::context::JobContext;
use tripwatch::jobs::types::{
    EvaluateAlertsJob, UpdateCrimeJob, UpdatePriceBatchJob, UpdateWeatherJob,
};
use tripwatch::logging;
use tripwatch::metrics::Metrics;
use tripwatch::services::alerts::AlertEvaluator;
use tripwatch::services::fetcher::SignalFetcher;
use tripwatch::services::notification::LogOnlyGateway;
use tripwatch::services::providers::HttpTravelDataProvider;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load environment variables from .env if present
    dotenv().ok();

    // Initialize logging based on environment
    logging::init_logging();

    let env = tripwatch::config::get_environment();
    info!("Starting Tripwatch Worker");
    info!(environment = %env, "Environment");

    // Initialize metrics
    let metrics = Arc::new(Metrics::new()?);

    // Initialize Postgres (required for destinations and histories)
    info!("Initializing Postgres connection...");
    let store = match TravelStore::new().await {
        Ok(s) => {
            info!("Postgres connected");
            metrics.database_connected.set(1.0);
            Arc::new(s)
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to Postgres");
            warn!("Worker requires Postgres - exiting");
            return Err(format!("Postgres connection required for worker: {}", e).into());
        }
    };

    // Initialize Redis cache (signal reads/writes go through it)
    info!("Initializing Redis connection...");
    let cache = match RedisCache::new().await {
        Ok(c) => {
            info!("Redis connected");
            metrics.cache_connected.set(1.0);
            Arc::new(c)
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to Redis");
            warn!("Worker requires Redis - exiting");
            return Err(format!("Redis connection required for worker: {}", e).into());
        }
    };

    // External data provider behind the cache
    let provider = Arc::new(HttpTravelDataProvider::new()?);

    let fetcher = Arc::new(
        SignalFetcher::new(cache.clone(), provider)
            .with_store(store.clone())
            .with_metrics(metrics.clone()),
    );

    let evaluator = Arc::new(
        AlertEvaluator::new(store.clone(), Arc::new(LogOnlyGateway))
            .with_metrics(metrics.clone()),
    );

    // Initialize Apalis storage backends
    info!("Initializing Apalis Redis storage...");
    let redis_url = tripwatch::config::get_redis_url();
    let conn = apalis_redis::connect(redis_url.clone()).await?;
    let weather_storage: Arc<RedisStorage<UpdateWeatherJob>> =
        Arc::new(RedisStorage::new(conn.clone()));
    let crime_storage: Arc<RedisStorage<UpdateCrimeJob>> =
        Arc::new(RedisStorage::new(conn.clone()));
    let price_storage: Arc<RedisStorage<UpdatePriceBatchJob>> =
        Arc::new(RedisStorage::new(conn.clone()));
    let alerts_storage: Arc<RedisStorage<EvaluateAlertsJob>> =
        Arc::new(RedisStorage::new(conn));
    info!("Apalis Redis storage initialized");

    // Create job context
    let job_context = Arc::new(JobContext::new(
        fetcher,
        store.clone(),
        evaluator,
        Some(metrics.clone()),
    ));

    // Initialize and start job runtime (workers)
    info!("Starting Apalis workers...");
    let runtime = IngestRuntime::new(
        job_context,
        weather_storage.clone(),
        crime_storage.clone(),
        price_storage.clone(),
        alerts_storage,
    );
    let worker_handles = runtime
        .start_workers()
        .await
        .map_err(|e| format!("Failed to start workers: {}", e))?;

    // Initialize and start scheduler
    info!("Starting batch scheduler...");
    let scheduler = BatchScheduler::new(store, weather_storage, crime_storage, price_storage);
    scheduler
        .start()
        .await
        .map_err(|e| format!("Failed to start scheduler: {}", e))?;

    // Graceful shutdown
    info!("Worker started, waiting for shutdown signal...");
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down worker...");
            scheduler.stop().await;
            for handle in worker_handles {
                handle.abort();
            }
            info!("Worker stopped");
        }
    }

    Ok(())
}
