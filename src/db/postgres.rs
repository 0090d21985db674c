//! Postgres-backed store for destinations, snapshot time series, alert
//! preferences, and favorites
//!
//! Snapshot tables are append-only; "latest" is always max timestamp per
//! destination. Appends for different destinations are safe under
//! concurrent writers; the schema cascades snapshot rows away when a
//! destination is deleted.

use crate::config;
use crate::models::alert::{AlertFrequency, AlertPreference};
use crate::models::destination::Destination;
use crate::models::snapshot::{CrimeSnapshot, PriceSnapshot, SignalType, Snapshot, WeatherSnapshot};
use crate::models::user::User;
use crate::services::similarity::FeatureInput;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_postgres::{Client, NoTls, Row};

fn db_error(context: &str, e: impl std::fmt::Display) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::other(format!("{}: {}", context, e)))
}

fn not_connected() -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::NotConnected,
        "Database connection not available",
    ))
}

/// A destination joined with its freshest weather score and prices,
/// as returned by the discovery ranking query.
#[derive(Debug, Clone)]
pub struct DestinationRanked {
    pub destination: Destination,
    pub weather_score: f64,
    pub flight_price: f64,
    pub hotel_price: f64,
}

pub struct TravelStore {
    client: Arc<RwLock<Option<Client>>>,
}

impl TravelStore {
    pub async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let database_url = config::get_database_url();
        let (client, connection) = tokio_postgres::connect(&database_url, NoTls)
            .await
            .map_err(|e| {
                Box::new(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    format!("Failed to connect to Postgres: {}", e),
                )) as Box<dyn std::error::Error + Send + Sync>
            })?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "Postgres connection error");
            }
        });

        let store = Self {
            client: Arc::new(RwLock::new(Some(client))),
        };

        store.init_schema().await?;

        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;

        let statements = [
            "CREATE TABLE IF NOT EXISTS destinations (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                airport_code TEXT NOT NULL,
                latitude DOUBLE PRECISION NOT NULL,
                longitude DOUBLE PRECISION NOT NULL,
                country TEXT NOT NULL,
                description TEXT
            )",
            "CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                phone TEXT,
                full_name TEXT
            )",
            "CREATE TABLE IF NOT EXISTS user_favorites (
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                destination_id BIGINT NOT NULL REFERENCES destinations(id) ON DELETE CASCADE,
                PRIMARY KEY (user_id, destination_id)
            )",
            "CREATE TABLE IF NOT EXISTS price_history (
                id BIGSERIAL PRIMARY KEY,
                destination_id BIGINT NOT NULL REFERENCES destinations(id) ON DELETE CASCADE,
                flight_price DOUBLE PRECISION NOT NULL,
                hotel_price DOUBLE PRECISION NOT NULL,
                timestamp TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
            "CREATE TABLE IF NOT EXISTS weather_data (
                id BIGSERIAL PRIMARY KEY,
                destination_id BIGINT NOT NULL REFERENCES destinations(id) ON DELETE CASCADE,
                temperature DOUBLE PRECISION NOT NULL,
                condition TEXT NOT NULL,
                weather_score DOUBLE PRECISION NOT NULL,
                timestamp TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
            "CREATE TABLE IF NOT EXISTS crime_data (
                id BIGSERIAL PRIMARY KEY,
                destination_id BIGINT NOT NULL REFERENCES destinations(id) ON DELETE CASCADE,
                crime_index DOUBLE PRECISION NOT NULL,
                safety_index DOUBLE PRECISION NOT NULL,
                timestamp TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
            "CREATE TABLE IF NOT EXISTS alert_preferences (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                destination_id BIGINT NOT NULL REFERENCES destinations(id) ON DELETE CASCADE,
                price_threshold DOUBLE PRECISION,
                alert_email BOOLEAN NOT NULL DEFAULT true,
                alert_sms BOOLEAN NOT NULL DEFAULT false,
                alert_push BOOLEAN NOT NULL DEFAULT false,
                frequency TEXT NOT NULL DEFAULT 'immediate',
                UNIQUE (user_id, destination_id)
            )",
            "CREATE INDEX IF NOT EXISTS idx_price_history_dest_ts
                 ON price_history (destination_id, timestamp DESC)",
            "CREATE INDEX IF NOT EXISTS idx_weather_data_dest_ts
                 ON weather_data (destination_id, timestamp DESC)",
            "CREATE INDEX IF NOT EXISTS idx_crime_data_dest_ts
                 ON crime_data (destination_id, timestamp DESC)",
        ];

        for statement in statements {
            c.execute(statement, &[])
                .await
                .map_err(|e| db_error("Failed to initialize schema", e))?;
        }

        Ok(())
    }

    pub async fn is_available(&self) -> bool {
        let client = self.client.read().await;
        client.is_some()
    }

    // ---- destinations ----

    pub async fn get_destination(
        &self,
        id: i64,
    ) -> Result<Option<Destination>, Box<dyn std::error::Error + Send + Sync>> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;

        let rows = c
            .query(
                "SELECT id, name, airport_code, latitude, longitude, country, description
                 FROM destinations WHERE id = $1",
                &[&id],
            )
            .await
            .map_err(|e| db_error("Failed to query destination", e))?;

        Ok(rows.first().map(row_to_destination))
    }

    pub async fn get_destinations(
        &self,
    ) -> Result<Vec<Destination>, Box<dyn std::error::Error + Send + Sync>> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;

        let rows = c
            .query(
                "SELECT id, name, airport_code, latitude, longitude, country, description
                 FROM destinations ORDER BY id",
                &[],
            )
            .await
            .map_err(|e| db_error("Failed to query destinations", e))?;

        Ok(rows.iter().map(row_to_destination).collect())
    }

    pub async fn get_destination_ids(
        &self,
    ) -> Result<Vec<i64>, Box<dyn std::error::Error + Send + Sync>> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;

        let rows = c
            .query("SELECT id FROM destinations ORDER BY id", &[])
            .await
            .map_err(|e| db_error("Failed to query destination ids", e))?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    pub async fn get_destinations_by_ids(
        &self,
        ids: &[i64],
    ) -> Result<Vec<Destination>, Box<dyn std::error::Error + Send + Sync>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;

        let id_vec: Vec<i64> = ids.to_vec();
        let rows = c
            .query(
                "SELECT id, name, airport_code, latitude, longitude, country, description
                 FROM destinations WHERE id = ANY($1)",
                &[&id_vec],
            )
            .await
            .map_err(|e| db_error("Failed to query destinations by ids", e))?;

        Ok(rows.iter().map(row_to_destination).collect())
    }

    // ---- snapshot appends ----

    pub async fn append_price(
        &self,
        snapshot: &PriceSnapshot,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;

        c.execute(
            "INSERT INTO price_history (destination_id, flight_price, hotel_price, timestamp)
             VALUES ($1, $2, $3, $4)",
            &[
                &snapshot.destination_id,
                &snapshot.flight_price,
                &snapshot.hotel_price,
                &snapshot.timestamp,
            ],
        )
        .await
        .map_err(|e| db_error("Failed to store price snapshot", e))?;

        Ok(())
    }

    /// Store a chunk of price snapshots in one transaction-scoped commit,
    /// so a batch job's writes land together.
    pub async fn append_prices_batch(
        &self,
        snapshots: &[PriceSnapshot],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if snapshots.is_empty() {
            return Ok(());
        }

        let mut client = self.client.write().await;
        let c = client.as_mut().ok_or_else(not_connected)?;

        let tx = c
            .transaction()
            .await
            .map_err(|e| db_error("Failed to open batch transaction", e))?;

        for snapshot in snapshots {
            tx.execute(
                "INSERT INTO price_history (destination_id, flight_price, hotel_price, timestamp)
                 VALUES ($1, $2, $3, $4)",
                &[
                    &snapshot.destination_id,
                    &snapshot.flight_price,
                    &snapshot.hotel_price,
                    &snapshot.timestamp,
                ],
            )
            .await
            .map_err(|e| db_error("Failed to store price snapshot in batch", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit price batch", e))?;

        Ok(())
    }

    pub async fn append_weather(
        &self,
        snapshot: &WeatherSnapshot,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;

        c.execute(
            "INSERT INTO weather_data (destination_id, temperature, condition, weather_score, timestamp)
             VALUES ($1, $2, $3, $4, $5)",
            &[
                &snapshot.destination_id,
                &snapshot.temperature,
                &snapshot.condition,
                &snapshot.weather_score,
                &snapshot.timestamp,
            ],
        )
        .await
        .map_err(|e| db_error("Failed to store weather snapshot", e))?;

        Ok(())
    }

    pub async fn append_crime(
        &self,
        snapshot: &CrimeSnapshot,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;

        c.execute(
            "INSERT INTO crime_data (destination_id, crime_index, safety_index, timestamp)
             VALUES ($1, $2, $3, $4)",
            &[
                &snapshot.destination_id,
                &snapshot.crime_index,
                &snapshot.safety_index,
                &snapshot.timestamp,
            ],
        )
        .await
        .map_err(|e| db_error("Failed to store crime snapshot", e))?;

        Ok(())
    }

    pub async fn append(
        &self,
        snapshot: &Snapshot,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match snapshot {
            Snapshot::Price(s) => self.append_price(s).await,
            Snapshot::Weather(s) => self.append_weather(s).await,
            Snapshot::Crime(s) => self.append_crime(s).await,
        }
    }

    // ---- snapshot queries ----

    pub async fn latest_price(
        &self,
        destination_id: i64,
    ) -> Result<Option<PriceSnapshot>, Box<dyn std::error::Error + Send + Sync>> {
        let snapshots = self.latest_prices(destination_id, 1).await?;
        Ok(snapshots.into_iter().next())
    }

    /// Latest `n` price snapshots, newest first
    pub async fn latest_prices(
        &self,
        destination_id: i64,
        n: usize,
    ) -> Result<Vec<PriceSnapshot>, Box<dyn std::error::Error + Send + Sync>> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;

        let limit = n as i64;
        let rows = c
            .query(
                "SELECT destination_id, flight_price, hotel_price, timestamp
                 FROM price_history
                 WHERE destination_id = $1
                 ORDER BY timestamp DESC
                 LIMIT $2",
                &[&destination_id, &limit],
            )
            .await
            .map_err(|e| db_error("Failed to query price snapshots", e))?;

        Ok(rows.iter().map(row_to_price).collect())
    }

    pub async fn latest_weather(
        &self,
        destination_id: i64,
    ) -> Result<Option<WeatherSnapshot>, Box<dyn std::error::Error + Send + Sync>> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;

        let rows = c
            .query(
                "SELECT destination_id, temperature, condition, weather_score, timestamp
                 FROM weather_data
                 WHERE destination_id = $1
                 ORDER BY timestamp DESC
                 LIMIT 1",
                &[&destination_id],
            )
            .await
            .map_err(|e| db_error("Failed to query weather snapshots", e))?;

        Ok(rows.first().map(row_to_weather))
    }

    pub async fn latest_crime(
        &self,
        destination_id: i64,
    ) -> Result<Option<CrimeSnapshot>, Box<dyn std::error::Error + Send + Sync>> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;

        let rows = c
            .query(
                "SELECT destination_id, crime_index, safety_index, timestamp
                 FROM crime_data
                 WHERE destination_id = $1
                 ORDER BY timestamp DESC
                 LIMIT 1",
                &[&destination_id],
            )
            .await
            .map_err(|e| db_error("Failed to query crime snapshots", e))?;

        Ok(rows.first().map(row_to_crime))
    }

    /// Latest snapshot of any signal type for a destination
    pub async fn latest(
        &self,
        destination_id: i64,
        signal: SignalType,
    ) -> Result<Option<Snapshot>, Box<dyn std::error::Error + Send + Sync>> {
        match signal {
            SignalType::Price => Ok(self.latest_price(destination_id).await?.map(Snapshot::Price)),
            SignalType::Weather => Ok(self
                .latest_weather(destination_id)
                .await?
                .map(Snapshot::Weather)),
            SignalType::Crime => Ok(self.latest_crime(destination_id).await?.map(Snapshot::Crime)),
        }
    }

    /// Latest `n` snapshots of a signal type, newest first
    pub async fn latest_n(
        &self,
        destination_id: i64,
        signal: SignalType,
        n: usize,
    ) -> Result<Vec<Snapshot>, Box<dyn std::error::Error + Send + Sync>> {
        if signal == SignalType::Price {
            return Ok(self
                .latest_prices(destination_id, n)
                .await?
                .into_iter()
                .map(Snapshot::Price)
                .collect());
        }

        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;
        let limit = n as i64;

        match signal {
            SignalType::Price => unreachable!(),
            SignalType::Weather => {
                let rows = c
                    .query(
                        "SELECT destination_id, temperature, condition, weather_score, timestamp
                         FROM weather_data
                         WHERE destination_id = $1
                         ORDER BY timestamp DESC
                         LIMIT $2",
                        &[&destination_id, &limit],
                    )
                    .await
                    .map_err(|e| db_error("Failed to query weather snapshots", e))?;
                Ok(rows
                    .iter()
                    .map(|r| Snapshot::Weather(row_to_weather(r)))
                    .collect())
            }
            SignalType::Crime => {
                let rows = c
                    .query(
                        "SELECT destination_id, crime_index, safety_index, timestamp
                         FROM crime_data
                         WHERE destination_id = $1
                         ORDER BY timestamp DESC
                         LIMIT $2",
                        &[&destination_id, &limit],
                    )
                    .await
                    .map_err(|e| db_error("Failed to query crime snapshots", e))?;
                Ok(rows
                    .iter()
                    .map(|r| Snapshot::Crime(row_to_crime(r)))
                    .collect())
            }
        }
    }

    /// Snapshots of a signal type since a point in time, oldest first
    pub async fn range(
        &self,
        destination_id: i64,
        signal: SignalType,
        since: DateTime<Utc>,
    ) -> Result<Vec<Snapshot>, Box<dyn std::error::Error + Send + Sync>> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;

        let (query, map): (&str, fn(&Row) -> Snapshot) = match signal {
            SignalType::Price => (
                "SELECT destination_id, flight_price, hotel_price, timestamp
                 FROM price_history
                 WHERE destination_id = $1 AND timestamp >= $2
                 ORDER BY timestamp ASC",
                |r| Snapshot::Price(row_to_price(r)),
            ),
            SignalType::Weather => (
                "SELECT destination_id, temperature, condition, weather_score, timestamp
                 FROM weather_data
                 WHERE destination_id = $1 AND timestamp >= $2
                 ORDER BY timestamp ASC",
                |r| Snapshot::Weather(row_to_weather(r)),
            ),
            SignalType::Crime => (
                "SELECT destination_id, crime_index, safety_index, timestamp
                 FROM crime_data
                 WHERE destination_id = $1 AND timestamp >= $2
                 ORDER BY timestamp ASC",
                |r| Snapshot::Crime(row_to_crime(r)),
            ),
        };

        let rows = c
            .query(query, &[&destination_id, &since])
            .await
            .map_err(|e| db_error("Failed to query snapshot range", e))?;

        Ok(rows.iter().map(map).collect())
    }

    // ---- recommendation inputs ----

    /// One feature row per destination: geocoordinate plus the latest value
    /// of each signal, absent signals surfaced as None for the engine's
    /// documented defaults.
    pub async fn feature_inputs(
        &self,
    ) -> Result<Vec<FeatureInput>, Box<dyn std::error::Error + Send + Sync>> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;

        let rows = c
            .query(
                "SELECT d.id, d.latitude, d.longitude,
                        w.temperature, w.weather_score,
                        c.safety_index,
                        p.flight_price, p.hotel_price
                 FROM destinations d
                 LEFT JOIN LATERAL (
                     SELECT temperature, weather_score FROM weather_data
                     WHERE destination_id = d.id ORDER BY timestamp DESC LIMIT 1
                 ) w ON true
                 LEFT JOIN LATERAL (
                     SELECT safety_index FROM crime_data
                     WHERE destination_id = d.id ORDER BY timestamp DESC LIMIT 1
                 ) c ON true
                 LEFT JOIN LATERAL (
                     SELECT flight_price, hotel_price FROM price_history
                     WHERE destination_id = d.id ORDER BY timestamp DESC LIMIT 1
                 ) p ON true
                 ORDER BY d.id",
                &[],
            )
            .await
            .map_err(|e| db_error("Failed to query feature inputs", e))?;

        Ok(rows
            .iter()
            .map(|row| FeatureInput {
                destination_id: row.get(0),
                latitude: row.get(1),
                longitude: row.get(2),
                temperature: row.get(3),
                weather_score: row.get(4),
                safety_index: row.get(5),
                flight_price: row.get(6),
                hotel_price: row.get(7),
            })
            .collect())
    }

    /// Destination-discovery ranking: freshest weather score within the
    /// window joined with the latest price, best weather first.
    pub async fn top_by_weather(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DestinationRanked>, Box<dyn std::error::Error + Send + Sync>> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;

        let limit = limit as i64;
        let rows = c
            .query(
                "SELECT d.id, d.name, d.airport_code, d.latitude, d.longitude, d.country,
                        d.description, w.weather_score, p.flight_price, p.hotel_price
                 FROM destinations d
                 JOIN LATERAL (
                     SELECT weather_score FROM weather_data
                     WHERE destination_id = d.id AND timestamp >= $1
                     ORDER BY timestamp DESC LIMIT 1
                 ) w ON true
                 JOIN LATERAL (
                     SELECT flight_price, hotel_price FROM price_history
                     WHERE destination_id = d.id
                     ORDER BY timestamp DESC LIMIT 1
                 ) p ON true
                 ORDER BY w.weather_score DESC
                 LIMIT $2",
                &[&since, &limit],
            )
            .await
            .map_err(|e| db_error("Failed to query top destinations", e))?;

        Ok(rows
            .iter()
            .map(|row| DestinationRanked {
                destination: row_to_destination(row),
                weather_score: row.get(7),
                flight_price: row.get(8),
                hotel_price: row.get(9),
            })
            .collect())
    }

    // ---- users, favorites, alert preferences ----

    pub async fn get_user(
        &self,
        id: i64,
    ) -> Result<Option<User>, Box<dyn std::error::Error + Send + Sync>> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;

        let rows = c
            .query(
                "SELECT id, email, phone, full_name FROM users WHERE id = $1",
                &[&id],
            )
            .await
            .map_err(|e| db_error("Failed to query user", e))?;

        Ok(rows.first().map(|row| User {
            id: row.get(0),
            email: row.get(1),
            phone: row.get(2),
            full_name: row.get(3),
        }))
    }

    pub async fn user_exists(
        &self,
        id: i64,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.get_user(id).await?.is_some())
    }

    pub async fn favorite_destination_ids(
        &self,
        user_id: i64,
    ) -> Result<Vec<i64>, Box<dyn std::error::Error + Send + Sync>> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;

        let rows = c
            .query(
                "SELECT destination_id FROM user_favorites WHERE user_id = $1 ORDER BY destination_id",
                &[&user_id],
            )
            .await
            .map_err(|e| db_error("Failed to query favorites", e))?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    pub async fn alert_preferences_for_destination(
        &self,
        destination_id: i64,
    ) -> Result<Vec<AlertPreference>, Box<dyn std::error::Error + Send + Sync>> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;

        let rows = c
            .query(
                "SELECT id, user_id, destination_id, price_threshold,
                        alert_email, alert_sms, alert_push, frequency
                 FROM alert_preferences
                 WHERE destination_id = $1",
                &[&destination_id],
            )
            .await
            .map_err(|e| db_error("Failed to query alert preferences", e))?;

        Ok(rows
            .iter()
            .map(|row| AlertPreference {
                id: row.get(0),
                user_id: row.get(1),
                destination_id: row.get(2),
                price_threshold: row.get(3),
                alert_email: row.get(4),
                alert_sms: row.get(5),
                alert_push: row.get(6),
                frequency: AlertFrequency::parse(row.get::<_, &str>(7)),
            })
            .collect())
    }
}

fn row_to_destination(row: &Row) -> Destination {
    Destination {
        id: row.get(0),
        name: row.get(1),
        airport_code: row.get(2),
        latitude: row.get(3),
        longitude: row.get(4),
        country: row.get(5),
        description: row.get(6),
    }
}

fn row_to_price(row: &Row) -> PriceSnapshot {
    PriceSnapshot {
        destination_id: row.get(0),
        flight_price: row.get(1),
        hotel_price: row.get(2),
        timestamp: row.get(3),
    }
}

fn row_to_weather(row: &Row) -> WeatherSnapshot {
    WeatherSnapshot {
        destination_id: row.get(0),
        temperature: row.get(1),
        condition: row.get(2),
        weather_score: row.get(3),
        timestamp: row.get(4),
    }
}

fn row_to_crime(row: &Row) -> CrimeSnapshot {
    CrimeSnapshot {
        destination_id: row.get(0),
        crime_index: row.get(1),
        safety_index: row.get(2),
        timestamp: row.get(3),
    }
}
