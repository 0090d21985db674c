//! Unit tests for cache-aside signal fetching

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tripwatch::cache::{hotel_price_cache_key, signal_cache_key, MemoryCache, SignalCache};
use tripwatch::models::{Destination, SignalType};
use tripwatch::services::fetcher::{FetchReport, SignalFetcher, HOTEL_PRICE_RATIO};
use tripwatch::services::providers::{
    CrimeObservation, TravelDataProvider, WeatherObservation, DEFAULT_CRIME_INDEX,
    DEFAULT_FLIGHT_PRICE,
};

fn lisbon() -> Destination {
    Destination {
        id: 1,
        name: "Lisbon".to_string(),
        airport_code: "LIS".to_string(),
        latitude: 38.7223,
        longitude: -9.1393,
        country: "Portugal".to_string(),
        description: None,
    }
}

/// Provider returning fixed values, counting calls, with per-signal failure
/// switches.
struct StubProvider {
    flight_price: f64,
    weather: WeatherObservation,
    crime: CrimeObservation,
    fail_flight: bool,
    fail_weather: bool,
    fail_crime: bool,
    calls: AtomicUsize,
}

impl StubProvider {
    fn new() -> Self {
        Self {
            flight_price: 321.0,
            weather: WeatherObservation {
                temperature: 24.0,
                condition: "Clear".to_string(),
            },
            crime: CrimeObservation {
                crime_index: 42.0,
                safety_index: 58.0,
            },
            fail_flight: false,
            fail_weather: false,
            fail_crime: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn err() -> Box<dyn std::error::Error + Send + Sync> {
        Box::new(std::io::Error::other("provider unavailable"))
    }
}

#[async_trait]
impl TravelDataProvider for StubProvider {
    async fn flight_price(
        &self,
        _destination: &Destination,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_flight {
            return Err(Self::err());
        }
        Ok(self.flight_price)
    }

    async fn weather(
        &self,
        _destination: &Destination,
    ) -> Result<WeatherObservation, Box<dyn std::error::Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_weather {
            return Err(Self::err());
        }
        Ok(self.weather.clone())
    }

    async fn crime(
        &self,
        _destination: &Destination,
    ) -> Result<CrimeObservation, Box<dyn std::error::Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_crime {
            return Err(Self::err());
        }
        Ok(self.crime.clone())
    }
}

fn fetcher_with(provider: StubProvider) -> (SignalFetcher, Arc<MemoryCache>, Arc<StubProvider>) {
    let cache = Arc::new(MemoryCache::new());
    let provider = Arc::new(provider);
    let fetcher = SignalFetcher::new(cache.clone(), provider.clone());
    (fetcher, cache, provider)
}

#[tokio::test]
async fn test_price_miss_fetches_and_populates_both_keys() {
    let (fetcher, cache, provider) = fetcher_with(StubProvider::new());
    let dest = lisbon();

    let resolution = fetcher.resolve_price(&dest).await.unwrap();
    assert!(!resolution.cached);
    assert_eq!(resolution.flight_price, 321.0);
    assert_eq!(resolution.hotel_price, 321.0 * HOTEL_PRICE_RATIO);

    let snapshot = resolution.snapshot.unwrap();
    assert_eq!(snapshot.destination_id, 1);
    assert_eq!(snapshot.flight_price, 321.0);

    let flight_key = signal_cache_key(SignalType::Price, &dest.name);
    let hotel_key = hotel_price_cache_key(&dest.name);
    assert_eq!(cache.get(&flight_key).await.as_deref(), Some("321"));
    assert!(cache.get(&hotel_key).await.is_some());
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_price_hit_skips_provider_and_produces_no_snapshot() {
    let (fetcher, _cache, provider) = fetcher_with(StubProvider::new());
    let dest = lisbon();

    fetcher.resolve_price(&dest).await.unwrap();
    let second = fetcher.resolve_price(&dest).await.unwrap();

    assert!(second.cached);
    assert!(second.snapshot.is_none());
    assert_eq!(second.flight_price, 321.0);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_price_hit_rederives_hotel_price_when_only_flight_is_cached() {
    let (fetcher, cache, _provider) = fetcher_with(StubProvider::new());
    let dest = lisbon();

    let flight_key = signal_cache_key(SignalType::Price, &dest.name);
    cache.set(&flight_key, "200", 60).await;

    let resolution = fetcher.resolve_price(&dest).await.unwrap();
    assert!(resolution.cached);
    assert_eq!(resolution.flight_price, 200.0);
    assert_eq!(resolution.hotel_price, 200.0 * HOTEL_PRICE_RATIO);
}

#[tokio::test]
async fn test_price_provider_failure_substitutes_default() {
    let mut provider = StubProvider::new();
    provider.fail_flight = true;
    let (fetcher, cache, _provider) = fetcher_with(provider);
    let dest = lisbon();

    let resolution = fetcher.resolve_price(&dest).await.unwrap();
    assert!(!resolution.cached);
    assert_eq!(resolution.flight_price, DEFAULT_FLIGHT_PRICE);
    assert_eq!(
        resolution.hotel_price,
        DEFAULT_FLIGHT_PRICE * HOTEL_PRICE_RATIO
    );
    // the default is cached like any fresh value
    let flight_key = signal_cache_key(SignalType::Price, &dest.name);
    assert_eq!(cache.get(&flight_key).await.as_deref(), Some("500"));
}

#[tokio::test]
async fn test_unparseable_cached_price_reads_as_miss() {
    let (fetcher, cache, provider) = fetcher_with(StubProvider::new());
    let dest = lisbon();

    let flight_key = signal_cache_key(SignalType::Price, &dest.name);
    cache.set(&flight_key, "not-a-number", 60).await;

    let resolution = fetcher.resolve_price(&dest).await.unwrap();
    assert!(!resolution.cached);
    assert_eq!(resolution.flight_price, 321.0);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_weather_miss_scores_and_caches() {
    let (fetcher, cache, _provider) = fetcher_with(StubProvider::new());
    let dest = lisbon();

    let report = fetcher.update_weather_for(&dest).await.unwrap();
    match report {
        FetchReport::Weather {
            cached,
            weather_score,
            temperature,
            condition,
            ..
        } => {
            assert!(!cached);
            assert_eq!(weather_score, 9.5);
            assert_eq!(temperature, Some(24.0));
            assert_eq!(condition.as_deref(), Some("Clear"));
        }
        other => panic!("unexpected report: {:?}", other),
    }

    let key = signal_cache_key(SignalType::Weather, &dest.name);
    assert_eq!(cache.get(&key).await.as_deref(), Some("9.5"));
}

#[tokio::test]
async fn test_weather_hit_returns_score_only() {
    let (fetcher, _cache, provider) = fetcher_with(StubProvider::new());
    let dest = lisbon();

    fetcher.update_weather_for(&dest).await.unwrap();
    let report = fetcher.update_weather_for(&dest).await.unwrap();
    match report {
        FetchReport::Weather {
            cached,
            weather_score,
            temperature,
            condition,
            ..
        } => {
            assert!(cached);
            assert_eq!(weather_score, 9.5);
            assert_eq!(temperature, None);
            assert_eq!(condition, None);
        }
        other => panic!("unexpected report: {:?}", other),
    }
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_weather_provider_failure_skips_update() {
    let mut provider = StubProvider::new();
    provider.fail_weather = true;
    let (fetcher, cache, _provider) = fetcher_with(provider);
    let dest = lisbon();

    let report = fetcher.update_weather_for(&dest).await.unwrap();
    assert!(matches!(
        report,
        FetchReport::WeatherUnavailable { destination_id: 1 }
    ));

    // no fallback value is cached for weather
    let key = signal_cache_key(SignalType::Weather, &dest.name);
    assert_eq!(cache.get(&key).await, None);
}

#[tokio::test]
async fn test_crime_miss_caches_index() {
    let (fetcher, cache, _provider) = fetcher_with(StubProvider::new());
    let dest = lisbon();

    let report = fetcher.update_crime_for(&dest).await.unwrap();
    match report {
        FetchReport::Crime {
            cached,
            crime_index,
            safety_index,
            ..
        } => {
            assert!(!cached);
            assert_eq!(crime_index, 42.0);
            assert_eq!(safety_index, Some(58.0));
        }
        other => panic!("unexpected report: {:?}", other),
    }

    let key = signal_cache_key(SignalType::Crime, &dest.name);
    assert_eq!(cache.get(&key).await.as_deref(), Some("42"));
}

#[tokio::test]
async fn test_crime_provider_failure_substitutes_defaults() {
    let mut provider = StubProvider::new();
    provider.fail_crime = true;
    let (fetcher, _cache, _provider) = fetcher_with(provider);
    let dest = lisbon();

    let report = fetcher.update_crime_for(&dest).await.unwrap();
    match report {
        FetchReport::Crime {
            cached,
            crime_index,
            safety_index,
            ..
        } => {
            assert!(!cached);
            assert_eq!(crime_index, DEFAULT_CRIME_INDEX);
            assert_eq!(safety_index, Some(DEFAULT_CRIME_INDEX));
        }
        other => panic!("unexpected report: {:?}", other),
    }
}
