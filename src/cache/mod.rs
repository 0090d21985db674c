//! Shared key-value cache for external signal values
//!
//! The cache is a pure accelerator: a backend failure is logged and surfaced
//! as a miss (on read) or a no-op (on write), never as an error to the
//! caller. The fetcher always falls back to a fresh fetch on miss.

use crate::config;
use crate::models::{Destination, SignalType};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

/// Cache key for a signal value, namespaced by signal type and destination
/// name so flight price, hotel price, weather score, and crime index never
/// collide.
pub fn signal_cache_key(signal: SignalType, destination_name: &str) -> String {
    match signal {
        SignalType::Price => format!("flight_price:{}", destination_name),
        SignalType::Weather => format!("weather:{}", destination_name),
        SignalType::Crime => format!("crime_index:{}", destination_name),
    }
}

/// Hotel prices are cached under their own key next to the flight price
pub fn hotel_price_cache_key(destination_name: &str) -> String {
    format!("hotel_price:{}", destination_name)
}

pub fn signal_key_for(signal: SignalType, destination: &Destination) -> String {
    signal_cache_key(signal, &destination.name)
}

/// Minimal get/set-with-TTL contract the pipeline depends on.
///
/// Implementations swallow backend errors: `get` returns `None` and `set`
/// does nothing on failure, both after logging a warning.
#[async_trait]
pub trait SignalCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str, ttl_secs: u64);
}

/// Redis-backed cache shared by every worker
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let redis_url = config::get_redis_url();
        let client = redis::Client::open(redis_url).map_err(|e| {
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Invalid Redis URL: {}", e),
            )) as Box<dyn std::error::Error + Send + Sync>
        })?;

        let conn = ConnectionManager::new(client).await.map_err(|e| {
            Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("Failed to connect to Redis: {}", e),
            )) as Box<dyn std::error::Error + Send + Sync>
        })?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl SignalCache for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) {
        let mut conn = self.conn.clone();
        if let Err(e) = conn.set_ex::<_, _, ()>(key, value, ttl_secs).await {
            warn!(key = %key, error = %e, "Cache write failed, value not cached");
        }
    }
}

/// In-process cache with per-entry deadlines.
///
/// Stands in for Redis in development and tests; same last-write-wins
/// semantics, entries past their deadline read as misses.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SignalCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some((value, deadline)) if Instant::now() < *deadline => Some(value.clone()),
            _ => None,
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) {
        let deadline = Instant::now() + Duration::from_secs(ttl_secs);
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), (value.to_string(), deadline));
    }
}
