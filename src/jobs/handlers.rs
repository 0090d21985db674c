//! Job handlers for the ingestion and alerting workflow

use crate::jobs::context::JobContext;
use crate::jobs::types::{EvaluateAlertsJob, UpdateCrimeJob, UpdatePriceBatchJob, UpdateWeatherJob};
use crate::services::fetcher::FetchReport;
use apalis::prelude::*;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Handler for per-destination weather refresh
pub async fn handle_update_weather(
    job: UpdateWeatherJob,
    ctx: Data<Arc<JobContext>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    debug!(destination_id = job.destination_id, "UpdateWeatherJob: refreshing weather");

    let report = ctx
        .fetcher
        .fetch_and_cache(job.destination_id, crate::models::SignalType::Weather)
        .await?;

    match report {
        FetchReport::Weather {
            cached,
            weather_score,
            ..
        } => {
            debug!(
                destination_id = job.destination_id,
                cached,
                weather_score,
                "UpdateWeatherJob: weather refreshed (cached: {})",
                cached
            );
        }
        FetchReport::WeatherUnavailable { .. } => {
            warn!(
                destination_id = job.destination_id,
                "UpdateWeatherJob: weather provider unavailable, update skipped"
            );
        }
        FetchReport::NotFound { .. } => {
            warn!(
                destination_id = job.destination_id,
                "UpdateWeatherJob: destination not found"
            );
        }
        _ => {}
    }

    Ok(())
}

/// Handler for per-destination crime refresh
pub async fn handle_update_crime(
    job: UpdateCrimeJob,
    ctx: Data<Arc<JobContext>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    debug!(destination_id = job.destination_id, "UpdateCrimeJob: refreshing crime data");

    let report = ctx
        .fetcher
        .fetch_and_cache(job.destination_id, crate::models::SignalType::Crime)
        .await?;

    if let FetchReport::Crime {
        cached,
        crime_index,
        ..
    } = report
    {
        debug!(
            destination_id = job.destination_id,
            cached,
            crime_index,
            "UpdateCrimeJob: crime data refreshed (cached: {})",
            cached
        );
    }

    Ok(())
}

/// Handler for a chunked price refresh.
///
/// Resolves cache-vs-fetch per destination, commits every fresh snapshot
/// in one transaction, then enqueues one EvaluateAlertsJob per freshly
/// priced destination. A missing or failing destination does not abort
/// the rest of the chunk.
pub async fn handle_update_price_batch(
    job: UpdatePriceBatchJob,
    ctx: Data<Arc<JobContext>>,
    alerts_storage: Data<apalis_redis::RedisStorage<EvaluateAlertsJob>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    debug!(
        chunk_size = job.destination_ids.len(),
        "UpdatePriceBatchJob: refreshing prices for {} destinations",
        job.destination_ids.len()
    );

    let mut snapshots = Vec::new();
    let mut fresh = Vec::new();

    for &destination_id in &job.destination_ids {
        let destination = match ctx.store.get_destination(destination_id).await {
            Ok(Some(d)) => d,
            Ok(None) => {
                warn!(destination_id, "UpdatePriceBatchJob: destination not found, skipping");
                continue;
            }
            Err(e) => {
                error!(
                    destination_id,
                    error = %e,
                    "UpdatePriceBatchJob: failed to load destination, skipping"
                );
                continue;
            }
        };

        match ctx.fetcher.resolve_price(&destination).await {
            Ok(resolution) => {
                if let Some(snapshot) = resolution.snapshot {
                    fresh.push((destination_id, snapshot.flight_price));
                    snapshots.push(snapshot);
                } else {
                    debug!(
                        destination = %destination.name,
                        "UpdatePriceBatchJob: cached price, no snapshot written"
                    );
                }
            }
            Err(e) => {
                error!(
                    destination = %destination.name,
                    error = %e,
                    "UpdatePriceBatchJob: price resolution failed, skipping destination"
                );
            }
        }
    }

    // One transaction-scoped commit for the whole chunk
    ctx.store.append_prices_batch(&snapshots).await?;

    for (destination_id, new_price) in fresh {
        let next_job = EvaluateAlertsJob {
            destination_id,
            new_price,
        };
        let mut storage = (*alerts_storage).clone();
        if let Err(e) = storage.push(next_job).await {
            error!(
                destination_id,
                error = %e,
                "UpdatePriceBatchJob: failed to enqueue EvaluateAlertsJob"
            );
        }
    }

    debug!(
        written = snapshots.len(),
        "UpdatePriceBatchJob: committed {} fresh snapshots",
        snapshots.len()
    );
    Ok(())
}

/// Handler for alert evaluation after a new price snapshot
pub async fn handle_evaluate_alerts(
    job: EvaluateAlertsJob,
    ctx: Data<Arc<JobContext>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    debug!(
        destination_id = job.destination_id,
        new_price = job.new_price,
        "EvaluateAlertsJob: evaluating alerts"
    );

    let dispatches = ctx
        .evaluator
        .evaluate_alerts(job.destination_id, job.new_price)
        .await?;

    if dispatches.is_empty() {
        debug!(
            destination_id = job.destination_id,
            "EvaluateAlertsJob: no alerts fired"
        );
    } else {
        info!(
            destination_id = job.destination_id,
            fired = dispatches.len(),
            "EvaluateAlertsJob: {} alerts fired",
            dispatches.len()
        );
    }

    Ok(())
}
