//! Cron-based scheduler for periodic signal ingestion
//!
//! Three cadences: weather hourly, prices every six hours, crime daily.
//! Each tick enumerates the current destinations; price updates are
//! chunked into bounded batch jobs, weather and crime go per-destination.
//! A tick that fires while the previous run is still in flight is not
//! deduplicated - the cache absorbs the duplicate work.

use crate::config;
use crate::db::TravelStore;
use crate::jobs::types::{UpdateCrimeJob, UpdatePriceBatchJob, UpdateWeatherJob};
use apalis::prelude::*;
use apalis_redis::RedisStorage;
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// Split destination ids into fixed-size chunks for batch jobs
pub fn chunk_ids(ids: &[i64], chunk_size: usize) -> Vec<Vec<i64>> {
    ids.chunks(chunk_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Convert a seconds interval into a 6-field cron expression.
///
/// Intervals that divide evenly into hours use hour granularity, into
/// minutes use minute granularity, anything else fires every N seconds.
pub fn interval_cron(interval_seconds: u64) -> String {
    if interval_seconds >= 3600 && interval_seconds % 3600 == 0 {
        let hours = interval_seconds / 3600;
        if hours >= 24 {
            "0 0 0 * * *".to_string()
        } else {
            format!("0 0 */{} * * *", hours)
        }
    } else if interval_seconds >= 60 && interval_seconds % 60 == 0 {
        format!("0 */{} * * * *", interval_seconds / 60)
    } else {
        format!("*/{} * * * * *", interval_seconds.max(1))
    }
}

pub struct BatchScheduler {
    store: Arc<TravelStore>,
    weather_storage: Arc<RedisStorage<UpdateWeatherJob>>,
    crime_storage: Arc<RedisStorage<UpdateCrimeJob>>,
    price_storage: Arc<RedisStorage<UpdatePriceBatchJob>>,
    handles: Arc<RwLock<Vec<tokio::task::JoinHandle<()>>>>,
}

impl BatchScheduler {
    pub fn new(
        store: Arc<TravelStore>,
        weather_storage: Arc<RedisStorage<UpdateWeatherJob>>,
        crime_storage: Arc<RedisStorage<UpdateCrimeJob>>,
        price_storage: Arc<RedisStorage<UpdatePriceBatchJob>>,
    ) -> Self {
        Self {
            store,
            weather_storage,
            crime_storage,
            price_storage,
            handles: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Start one cron loop per cadence
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let weather_schedule = parse_schedule(config::WEATHER_UPDATE_INTERVAL_SECS)?;
        let price_schedule = parse_schedule(config::PRICE_UPDATE_INTERVAL_SECS)?;
        let crime_schedule = parse_schedule(config::CRIME_UPDATE_INTERVAL_SECS)?;

        let mut handles = self.handles.write().await;

        {
            let store = self.store.clone();
            let storage = self.weather_storage.clone();
            handles.push(tokio::spawn(async move {
                run_schedule(weather_schedule, "weather", move || {
                    let store = store.clone();
                    let storage = storage.clone();
                    async move {
                        let ids = match store.get_destination_ids().await {
                            Ok(ids) => ids,
                            Err(e) => {
                                error!(error = %e, "Scheduler: failed to enumerate destinations for weather tick");
                                return;
                            }
                        };
                        info!(
                            destinations = ids.len(),
                            "Scheduler: weather tick, enqueuing {} jobs",
                            ids.len()
                        );
                        for destination_id in ids {
                            let mut storage = (*storage).clone();
                            if let Err(e) = storage.push(UpdateWeatherJob { destination_id }).await
                            {
                                error!(
                                    destination_id,
                                    error = %e,
                                    "Scheduler: failed to enqueue UpdateWeatherJob"
                                );
                            }
                        }
                    }
                })
                .await;
            }));
        }

        {
            let store = self.store.clone();
            let storage = self.price_storage.clone();
            handles.push(tokio::spawn(async move {
                run_schedule(price_schedule, "price", move || {
                    let store = store.clone();
                    let storage = storage.clone();
                    async move {
                        let ids = match store.get_destination_ids().await {
                            Ok(ids) => ids,
                            Err(e) => {
                                error!(error = %e, "Scheduler: failed to enumerate destinations for price tick");
                                return;
                            }
                        };
                        let chunks = chunk_ids(&ids, config::PRICE_BATCH_CHUNK_SIZE);
                        info!(
                            destinations = ids.len(),
                            chunks = chunks.len(),
                            "Scheduler: price tick, enqueuing {} batch jobs",
                            chunks.len()
                        );
                        for destination_ids in chunks {
                            let mut storage = (*storage).clone();
                            if let Err(e) =
                                storage.push(UpdatePriceBatchJob { destination_ids }).await
                            {
                                error!(
                                    error = %e,
                                    "Scheduler: failed to enqueue UpdatePriceBatchJob"
                                );
                            }
                        }
                    }
                })
                .await;
            }));
        }

        {
            let store = self.store.clone();
            let storage = self.crime_storage.clone();
            handles.push(tokio::spawn(async move {
                run_schedule(crime_schedule, "crime", move || {
                    let store = store.clone();
                    let storage = storage.clone();
                    async move {
                        let ids = match store.get_destination_ids().await {
                            Ok(ids) => ids,
                            Err(e) => {
                                error!(error = %e, "Scheduler: failed to enumerate destinations for crime tick");
                                return;
                            }
                        };
                        info!(
                            destinations = ids.len(),
                            "Scheduler: crime tick, enqueuing {} jobs",
                            ids.len()
                        );
                        for destination_id in ids {
                            let mut storage = (*storage).clone();
                            if let Err(e) = storage.push(UpdateCrimeJob { destination_id }).await {
                                error!(
                                    destination_id,
                                    error = %e,
                                    "Scheduler: failed to enqueue UpdateCrimeJob"
                                );
                            }
                        }
                    }
                })
                .await;
            }));
        }

        info!("BatchScheduler: started (weather hourly, price 6h, crime daily)");
        Ok(())
    }

    /// Stop all cron loops
    pub async fn stop(&self) {
        let mut handles = self.handles.write().await;
        for handle in handles.drain(..) {
            handle.abort();
        }
        info!("BatchScheduler: stopped");
    }

    pub async fn is_running(&self) -> bool {
        let handles = self.handles.read().await;
        !handles.is_empty()
    }
}

fn parse_schedule(
    interval_seconds: u64,
) -> Result<Schedule, Box<dyn std::error::Error + Send + Sync>> {
    let cron_expr = interval_cron(interval_seconds);
    Schedule::from_str(&cron_expr).map_err(|e| {
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Invalid cron expression '{}': {}", cron_expr, e),
        )) as Box<dyn std::error::Error + Send + Sync>
    })
}

/// Sleep until each upcoming cron tick and run the tick closure
async fn run_schedule<F, Fut>(schedule: Schedule, name: &'static str, tick: F)
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    debug!(schedule = %schedule, cadence = name, "Scheduler loop started");
    loop {
        let mut upcoming = schedule.upcoming(chrono::Utc);
        if let Some(next_tick) = upcoming.next() {
            let now = chrono::Utc::now();
            if next_tick > now {
                let duration = (next_tick - now).to_std().unwrap_or_default();
                tokio::time::sleep(duration).await;
            }
        } else {
            tokio::time::sleep(tokio::time::Duration::from_secs(60)).await;
            continue;
        }

        tick().await;
    }
}
