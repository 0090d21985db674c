//! Cache-aside signal fetching
//!
//! Read path per signal: cache hit returns the cached value, a miss calls
//! the external provider with a bounded timeout, provider failure
//! substitutes documented defaults, and fresh values are written to the
//! cache and appended to the snapshot store.

use crate::cache::{hotel_price_cache_key, signal_cache_key, SignalCache};
use crate::config;
use crate::db::TravelStore;
use crate::metrics::Metrics;
use crate::models::destination::Destination;
use crate::models::snapshot::{CrimeSnapshot, PriceSnapshot, SignalType, WeatherSnapshot};
use crate::services::providers::{TravelDataProvider, DEFAULT_CRIME_INDEX, DEFAULT_FLIGHT_PRICE};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Hotel price is modeled as a fixed fraction of the flight price
pub const HOTEL_PRICE_RATIO: f64 = 0.8;

/// Score a weather reading into [0, 10].
///
/// Bands are evaluated top to bottom; the first match wins.
pub fn weather_score(temperature: f64, condition: &str) -> f64 {
    if (22.0..=30.0).contains(&temperature) && condition == "Clear" {
        9.5
    } else if (18.0..22.0).contains(&temperature) {
        8.5
    } else if (temperature > 30.0 && temperature <= 35.0) || condition == "Clouds" {
        7.5
    } else if matches!(condition, "Rain" | "Thunderstorm" | "Snow") {
        5.0
    } else {
        6.5
    }
}

/// Outcome of a fetch operation.
///
/// Cache hits carry only what the cache holds (the scored/indexed value);
/// raw provider fields are present on fresh fetches only.
#[derive(Debug, Clone)]
pub enum FetchReport {
    NotFound {
        destination_id: i64,
    },
    Price {
        destination_id: i64,
        cached: bool,
        flight_price: f64,
        hotel_price: f64,
    },
    Weather {
        destination_id: i64,
        cached: bool,
        weather_score: f64,
        temperature: Option<f64>,
        condition: Option<String>,
    },
    /// Weather has no documented fallback; a provider failure skips the
    /// update and self-corrects on the next scheduled cycle.
    WeatherUnavailable {
        destination_id: i64,
    },
    Crime {
        destination_id: i64,
        cached: bool,
        crime_index: f64,
        safety_index: Option<f64>,
    },
}

impl FetchReport {
    pub fn cached(&self) -> bool {
        match self {
            FetchReport::Price { cached, .. }
            | FetchReport::Weather { cached, .. }
            | FetchReport::Crime { cached, .. } => *cached,
            _ => false,
        }
    }
}

/// Resolved price pair plus the snapshot to persist (absent on cache hit)
#[derive(Debug, Clone)]
pub struct PriceResolution {
    pub flight_price: f64,
    pub hotel_price: f64,
    pub cached: bool,
    pub snapshot: Option<PriceSnapshot>,
}

pub struct SignalFetcher {
    cache: Arc<dyn SignalCache>,
    provider: Arc<dyn TravelDataProvider>,
    store: Option<Arc<TravelStore>>,
    metrics: Option<Arc<Metrics>>,
}

impl SignalFetcher {
    pub fn new(cache: Arc<dyn SignalCache>, provider: Arc<dyn TravelDataProvider>) -> Self {
        Self {
            cache,
            provider,
            store: None,
            metrics: None,
        }
    }

    pub fn with_store(mut self, store: Arc<TravelStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Unified entry point: resolve the destination and dispatch per signal.
    /// An unknown destination is a `NotFound` outcome, not an error, so a
    /// batch containing it keeps processing its other destinations.
    pub async fn fetch_and_cache(
        &self,
        destination_id: i64,
        signal: SignalType,
    ) -> Result<FetchReport, Box<dyn std::error::Error + Send + Sync>> {
        let store = self.store.as_ref().ok_or_else(|| {
            Box::new(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Snapshot store required for fetch_and_cache",
            )) as Box<dyn std::error::Error + Send + Sync>
        })?;

        let destination = match store.get_destination(destination_id).await? {
            Some(d) => d,
            None => {
                warn!(destination_id, "Fetch requested for unknown destination");
                return Ok(FetchReport::NotFound { destination_id });
            }
        };

        match signal {
            SignalType::Price => self.update_price_for(&destination).await,
            SignalType::Weather => self.update_weather_for(&destination).await,
            SignalType::Crime => self.update_crime_for(&destination).await,
        }
    }

    /// Resolve a destination's prices cache-aside without persisting.
    ///
    /// Batch jobs collect the returned snapshots and commit them in one
    /// transaction instead of row-by-row.
    pub async fn resolve_price(
        &self,
        destination: &Destination,
    ) -> Result<PriceResolution, Box<dyn std::error::Error + Send + Sync>> {
        let start = Instant::now();
        if let Some(ref metrics) = self.metrics {
            metrics.signal_fetches_total.inc();
        }

        let flight_key = signal_cache_key(SignalType::Price, &destination.name);
        let hotel_key = hotel_price_cache_key(&destination.name);

        if let Some(cached_flight) = self.read_cached_f64(&flight_key).await {
            let hotel_price = match self.read_cached_f64(&hotel_key).await {
                Some(hotel) => hotel,
                None => cached_flight * HOTEL_PRICE_RATIO,
            };
            debug!(
                destination = %destination.name,
                flight_price = cached_flight,
                "Using cached price data"
            );
            self.record_hit(start);
            return Ok(PriceResolution {
                flight_price: cached_flight,
                hotel_price,
                cached: true,
                snapshot: None,
            });
        }

        let flight_price = match self.provider.flight_price(destination).await {
            Ok(price) => price,
            Err(e) => {
                warn!(
                    destination = %destination.name,
                    error = %e,
                    "Flight price fetch failed, using default"
                );
                if let Some(ref metrics) = self.metrics {
                    metrics.provider_failures_total.inc();
                }
                DEFAULT_FLIGHT_PRICE
            }
        };
        let hotel_price = flight_price * HOTEL_PRICE_RATIO;

        self.cache
            .set(
                &flight_key,
                &flight_price.to_string(),
                config::PRICE_CACHE_TTL_SECS,
            )
            .await;
        self.cache
            .set(
                &hotel_key,
                &hotel_price.to_string(),
                config::PRICE_CACHE_TTL_SECS,
            )
            .await;

        self.record_miss(start);
        Ok(PriceResolution {
            flight_price,
            hotel_price,
            cached: false,
            snapshot: Some(PriceSnapshot::new(
                destination.id,
                flight_price,
                hotel_price,
            )),
        })
    }

    /// Full price update for one destination: resolve, persist on fresh data
    pub async fn update_price_for(
        &self,
        destination: &Destination,
    ) -> Result<FetchReport, Box<dyn std::error::Error + Send + Sync>> {
        let resolution = self.resolve_price(destination).await?;

        if let Some(ref snapshot) = resolution.snapshot {
            if let Some(ref store) = self.store {
                store.append_price(snapshot).await?;
            }
        }

        Ok(FetchReport::Price {
            destination_id: destination.id,
            cached: resolution.cached,
            flight_price: resolution.flight_price,
            hotel_price: resolution.hotel_price,
        })
    }

    pub async fn update_weather_for(
        &self,
        destination: &Destination,
    ) -> Result<FetchReport, Box<dyn std::error::Error + Send + Sync>> {
        let start = Instant::now();
        if let Some(ref metrics) = self.metrics {
            metrics.signal_fetches_total.inc();
        }

        let key = signal_cache_key(SignalType::Weather, &destination.name);
        if let Some(score) = self.read_cached_f64(&key).await {
            debug!(destination = %destination.name, weather_score = score, "Using cached weather data");
            self.record_hit(start);
            return Ok(FetchReport::Weather {
                destination_id: destination.id,
                cached: true,
                weather_score: score,
                temperature: None,
                condition: None,
            });
        }

        let observation = match self.provider.weather(destination).await {
            Ok(obs) => obs,
            Err(e) => {
                warn!(
                    destination = %destination.name,
                    error = %e,
                    "Weather fetch failed, skipping update"
                );
                if let Some(ref metrics) = self.metrics {
                    metrics.provider_failures_total.inc();
                }
                self.record_miss(start);
                return Ok(FetchReport::WeatherUnavailable {
                    destination_id: destination.id,
                });
            }
        };

        let score = weather_score(observation.temperature, &observation.condition);

        self.cache
            .set(&key, &score.to_string(), config::WEATHER_CACHE_TTL_SECS)
            .await;

        if let Some(ref store) = self.store {
            store
                .append_weather(&WeatherSnapshot::new(
                    destination.id,
                    observation.temperature,
                    observation.condition.clone(),
                    score,
                ))
                .await?;
        }

        self.record_miss(start);
        Ok(FetchReport::Weather {
            destination_id: destination.id,
            cached: false,
            weather_score: score,
            temperature: Some(observation.temperature),
            condition: Some(observation.condition),
        })
    }

    pub async fn update_crime_for(
        &self,
        destination: &Destination,
    ) -> Result<FetchReport, Box<dyn std::error::Error + Send + Sync>> {
        let start = Instant::now();
        if let Some(ref metrics) = self.metrics {
            metrics.signal_fetches_total.inc();
        }

        let key = signal_cache_key(SignalType::Crime, &destination.name);
        if let Some(crime_index) = self.read_cached_f64(&key).await {
            debug!(destination = %destination.name, crime_index, "Using cached crime data");
            self.record_hit(start);
            return Ok(FetchReport::Crime {
                destination_id: destination.id,
                cached: true,
                crime_index,
                safety_index: None,
            });
        }

        let observation = match self.provider.crime(destination).await {
            Ok(obs) => obs,
            Err(e) => {
                warn!(
                    destination = %destination.name,
                    error = %e,
                    "Crime fetch failed, using defaults"
                );
                if let Some(ref metrics) = self.metrics {
                    metrics.provider_failures_total.inc();
                }
                crate::services::providers::CrimeObservation {
                    crime_index: DEFAULT_CRIME_INDEX,
                    safety_index: DEFAULT_CRIME_INDEX,
                }
            }
        };

        self.cache
            .set(
                &key,
                &observation.crime_index.to_string(),
                config::CRIME_CACHE_TTL_SECS,
            )
            .await;

        if let Some(ref store) = self.store {
            store
                .append_crime(&CrimeSnapshot::new(
                    destination.id,
                    observation.crime_index,
                    observation.safety_index,
                ))
                .await?;
        }

        self.record_miss(start);
        Ok(FetchReport::Crime {
            destination_id: destination.id,
            cached: false,
            crime_index: observation.crime_index,
            safety_index: Some(observation.safety_index),
        })
    }

    /// Cache values are stored as plain decimal strings; anything
    /// unparseable reads as a miss.
    async fn read_cached_f64(&self, key: &str) -> Option<f64> {
        let raw = self.cache.get(key).await?;
        match raw.parse::<f64>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(key = %key, value = %raw, "Unparseable cached value, treating as miss");
                None
            }
        }
    }

    fn record_hit(&self, start: Instant) {
        if let Some(ref metrics) = self.metrics {
            metrics.cache_hits_total.inc();
            metrics
                .fetch_duration_seconds
                .observe(start.elapsed().as_secs_f64());
        }
    }

    fn record_miss(&self, start: Instant) {
        if let Some(ref metrics) = self.metrics {
            metrics.cache_misses_total.inc();
            metrics
                .fetch_duration_seconds
                .observe(start.elapsed().as_secs_f64());
        }
    }
}
