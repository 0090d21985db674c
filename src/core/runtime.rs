//! Apalis worker setup for ingestion and alert evaluation jobs

use crate::jobs::context::JobContext;
use crate::jobs::handlers;
use crate::jobs::types::{EvaluateAlertsJob, UpdateCrimeJob, UpdatePriceBatchJob, UpdateWeatherJob};
use apalis::prelude::*;
use apalis_redis::RedisStorage;
use std::sync::Arc;
use tracing::info;

/// Runtime that spawns one Apalis worker per job type, all pulling from
/// the shared Redis-backed queue. Any number of workers may process jobs
/// for different destinations concurrently.
pub struct IngestRuntime {
    job_context: Arc<JobContext>,
    weather_storage: Arc<RedisStorage<UpdateWeatherJob>>,
    crime_storage: Arc<RedisStorage<UpdateCrimeJob>>,
    price_storage: Arc<RedisStorage<UpdatePriceBatchJob>>,
    alerts_storage: Arc<RedisStorage<EvaluateAlertsJob>>,
}

impl IngestRuntime {
    pub fn new(
        job_context: Arc<JobContext>,
        weather_storage: Arc<RedisStorage<UpdateWeatherJob>>,
        crime_storage: Arc<RedisStorage<UpdateCrimeJob>>,
        price_storage: Arc<RedisStorage<UpdatePriceBatchJob>>,
        alerts_storage: Arc<RedisStorage<EvaluateAlertsJob>>,
    ) -> Self {
        Self {
            job_context,
            weather_storage,
            crime_storage,
            price_storage,
            alerts_storage,
        }
    }

    /// Start all workers and return handles for graceful shutdown
    pub async fn start_workers(
        &self,
    ) -> Result<Vec<tokio::task::JoinHandle<()>>, Box<dyn std::error::Error + Send + Sync>> {
        let mut handles = Vec::new();

        info!("IngestRuntime: starting Apalis workers");

        let weather_storage = (*self.weather_storage).clone();
        let job_context = self.job_context.clone();
        handles.push(tokio::spawn(async move {
            let worker = WorkerBuilder::new("update-weather-worker")
                .data(job_context)
                .backend(weather_storage)
                .build_fn(handlers::handle_update_weather);

            info!("IngestRuntime: UpdateWeatherJob worker started");
            worker.run().await;
        }));

        let crime_storage = (*self.crime_storage).clone();
        let job_context = self.job_context.clone();
        handles.push(tokio::spawn(async move {
            let worker = WorkerBuilder::new("update-crime-worker")
                .data(job_context)
                .backend(crime_storage)
                .build_fn(handlers::handle_update_crime);

            info!("IngestRuntime: UpdateCrimeJob worker started");
            worker.run().await;
        }));

        let price_storage = (*self.price_storage).clone();
        let alerts_storage = (*self.alerts_storage).clone();
        let job_context = self.job_context.clone();
        handles.push(tokio::spawn(async move {
            let worker = WorkerBuilder::new("update-price-batch-worker")
                .data(job_context)
                .data(alerts_storage)
                .backend(price_storage)
                .build_fn(handlers::handle_update_price_batch);

            info!("IngestRuntime: UpdatePriceBatchJob worker started");
            worker.run().await;
        }));

        let alerts_storage_worker = (*self.alerts_storage).clone();
        let job_context = self.job_context.clone();
        handles.push(tokio::spawn(async move {
            let worker = WorkerBuilder::new("evaluate-alerts-worker")
                .data(job_context)
                .backend(alerts_storage_worker)
                .build_fn(handlers::handle_evaluate_alerts);

            info!("IngestRuntime: EvaluateAlertsJob worker started");
            worker.run().await;
        }));

        info!("IngestRuntime: all workers started");
        Ok(handles)
    }
}
