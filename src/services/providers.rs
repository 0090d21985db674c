//! External data providers for price, weather, and crime signals
//!
//! Each provider call carries the client-side timeout from config; callers
//! treat any error here as transient and substitute documented defaults.

use crate::config;
use crate::models::destination::Destination;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Fallback flight price when the provider returns nothing usable
pub const DEFAULT_FLIGHT_PRICE: f64 = 500.0;
/// Fallback crime/safety index
pub const DEFAULT_CRIME_INDEX: f64 = 50.0;

/// One weather reading as reported by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherObservation {
    pub temperature: f64,
    pub condition: String,
}

/// One crime reading as reported by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct CrimeObservation {
    pub crime_index: f64,
    pub safety_index: f64,
}

/// External source of the three tracked signals
#[async_trait]
pub trait TravelDataProvider: Send + Sync {
    async fn flight_price(
        &self,
        destination: &Destination,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>>;

    async fn weather(
        &self,
        destination: &Destination,
    ) -> Result<WeatherObservation, Box<dyn std::error::Error + Send + Sync>>;

    async fn crime(
        &self,
        destination: &Destination,
    ) -> Result<CrimeObservation, Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Debug, Deserialize)]
struct FlightQuotesResponse {
    #[serde(rename = "Quotes", default)]
    quotes: Vec<FlightQuote>,
}

#[derive(Debug, Deserialize)]
struct FlightQuote {
    #[serde(rename = "MinPrice")]
    min_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    main: WeatherMain,
    weather: Vec<WeatherCondition>,
}

#[derive(Debug, Deserialize)]
struct WeatherMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct WeatherCondition {
    main: String,
}

#[derive(Debug, Deserialize)]
struct CrimeResponse {
    crime_index: Option<f64>,
    safety_index: Option<f64>,
}

/// HTTP-backed provider hitting the flight, weather, and crime APIs
pub struct HttpTravelDataProvider {
    client: reqwest::Client,
    flight_api_base: String,
    weather_api_base: String,
    crime_api_base: String,
}

impl HttpTravelDataProvider {
    pub fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config::PROVIDER_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                Box::new(std::io::Error::other(format!(
                    "Failed to build HTTP client: {}",
                    e
                ))) as Box<dyn std::error::Error + Send + Sync>
            })?;

        Ok(Self {
            client,
            flight_api_base: config::get_flight_api_base(),
            weather_api_base: config::get_weather_api_base(),
            crime_api_base: config::get_crime_api_base(),
        })
    }

    /// Construct with explicit base URLs and client, for pointing the
    /// provider at a mock server.
    pub fn with_bases(
        flight_api_base: String,
        weather_api_base: String,
        crime_api_base: String,
        client: reqwest::Client,
    ) -> Self {
        Self {
            client,
            flight_api_base,
            weather_api_base,
            crime_api_base,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, Box<dyn std::error::Error + Send + Sync>> {
        let response = self.client.get(url).send().await.map_err(|e| {
            Box::new(std::io::Error::other(format!(
                "Provider request failed: {}",
                e
            ))) as Box<dyn std::error::Error + Send + Sync>
        })?;

        let response = response.error_for_status().map_err(|e| {
            Box::new(std::io::Error::other(format!(
                "Provider returned error status: {}",
                e
            ))) as Box<dyn std::error::Error + Send + Sync>
        })?;

        response.json::<T>().await.map_err(|e| {
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Provider returned unparseable payload: {}", e),
            )) as Box<dyn std::error::Error + Send + Sync>
        })
    }
}

#[async_trait]
impl TravelDataProvider for HttpTravelDataProvider {
    async fn flight_price(
        &self,
        destination: &Destination,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        let url = format!(
            "{}/apiservices/browsequotes/v1.0/US/USD/en-US/LAX-sky/{}/cheapest?apiKey={}",
            self.flight_api_base,
            destination.airport_code,
            config::get_skyscanner_api_key()
        );

        let quotes: FlightQuotesResponse = self.get_json(&url).await?;

        // The provider may answer with an empty quote list; that is not an
        // error, just an absent price.
        Ok(quotes
            .quotes
            .first()
            .and_then(|q| q.min_price)
            .unwrap_or(DEFAULT_FLIGHT_PRICE))
    }

    async fn weather(
        &self,
        destination: &Destination,
    ) -> Result<WeatherObservation, Box<dyn std::error::Error + Send + Sync>> {
        let url = format!(
            "{}/data/2.5/weather?lat={}&lon={}&appid={}&units=metric",
            self.weather_api_base,
            destination.latitude,
            destination.longitude,
            config::get_openweather_api_key()
        );

        let response: WeatherResponse = self.get_json(&url).await?;
        let condition = response
            .weather
            .into_iter()
            .next()
            .map(|c| c.main)
            .ok_or_else(|| {
                Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "Weather payload had no condition entry",
                )) as Box<dyn std::error::Error + Send + Sync>
            })?;

        Ok(WeatherObservation {
            temperature: response.main.temp,
            condition,
        })
    }

    async fn crime(
        &self,
        destination: &Destination,
    ) -> Result<CrimeObservation, Box<dyn std::error::Error + Send + Sync>> {
        let url = format!(
            "{}/api/city_crime?api_key={}&query={}",
            self.crime_api_base,
            config::get_numbeo_api_key(),
            destination.name
        );

        let response: CrimeResponse = self.get_json(&url).await?;

        Ok(CrimeObservation {
            crime_index: response.crime_index.unwrap_or(DEFAULT_CRIME_INDEX),
            safety_index: response.safety_index.unwrap_or(DEFAULT_CRIME_INDEX),
        })
    }
}
