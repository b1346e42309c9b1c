//! # Weather Tool Shim
//!
//! A small HTTP server fronting the OpenWeather current-weather API so that
//! the `fetch_weather` tool can reach it with a plain JSON POST.
//!
//! ```text
//! POST /tools/get_weather  {"city": "...", "api_key": "..."}
//!   200 {"result": "Weather in Paris: clear sky, Temp: 22.5°C"}
//!   400 {"error": "Missing city or api_key"}
//!   502 {"error": "Error fetching weather data."}
//! GET  /health
//! ```

use crate::error::ApiError;
use async_trait::async_trait;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use runbridge_core::env::get_env_string;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, warn};

pub const DEFAULT_OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);
const MISSING_ARGUMENTS: &str = "Missing city or api_key";
const FETCH_FAILED: &str = "Error fetching weather data.";

/// Failure talking to the weather provider
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    Request(String),

    #[error("weather provider returned HTTP {status}")]
    Upstream { status: u16 },

    #[error("unexpected weather payload: {0}")]
    Malformed(String),
}

/// Source of current-weather descriptions
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Human-readable current weather for `city`
    async fn current_weather(&self, city: &str, api_key: &str) -> Result<String, WeatherError>;
}

/// [`WeatherProvider`] backed by the OpenWeather REST API
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    http: reqwest::Client,
    base_url: String,
}

impl Default for OpenWeatherProvider {
    fn default() -> Self {
        Self::new(DEFAULT_OPENWEATHER_BASE_URL)
    }
}

impl OpenWeatherProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Base URL from `RUNBRIDGE_OPENWEATHER_BASE_URL`, falling back to the public API
    pub fn from_env() -> Self {
        get_env_string("RUNBRIDGE_OPENWEATHER_BASE_URL")
            .map(Self::new)
            .unwrap_or_default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current_weather(&self, city: &str, api_key: &str) -> Result<String, WeatherError> {
        let response = self
            .http
            .get(format!("{}/data/2.5/weather", self.base_url))
            .query(&[("q", city), ("appid", api_key), ("units", "metric")])
            .send()
            .await
            .map_err(|e| WeatherError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Upstream {
                status: status.as_u16(),
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| WeatherError::Malformed(e.to_string()))?;
        describe(city, &data)
    }
}

/// `Weather in {city}: {description}, Temp: {temp}°C`
fn describe(city: &str, data: &Value) -> Result<String, WeatherError> {
    let description = data["weather"][0]["description"]
        .as_str()
        .ok_or_else(|| WeatherError::Malformed("missing weather[0].description".into()))?;
    let temp = &data["main"]["temp"];
    if !temp.is_number() {
        return Err(WeatherError::Malformed("missing main.temp".into()));
    }
    Ok(format!(
        "Weather in {}: {}, Temp: {}°C",
        city, description, temp
    ))
}

#[derive(Debug, Deserialize)]
struct GetWeatherRequest {
    city: Option<String>,
    api_key: Option<String>,
}

/// Router serving the shim endpoints
pub fn weather_router(provider: Arc<dyn WeatherProvider>) -> Router {
    Router::new()
        .route("/tools/get_weather", post(get_weather))
        .route("/health", get(health))
        .with_state(provider)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn get_weather(
    State(provider): State<Arc<dyn WeatherProvider>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: GetWeatherRequest =
        serde_json::from_slice(&body).map_err(|_| ApiError::bad_request(MISSING_ARGUMENTS))?;

    let (city, api_key) = match (request.city, request.api_key) {
        (Some(city), Some(api_key)) if !city.is_empty() && !api_key.is_empty() => (city, api_key),
        _ => return Err(ApiError::bad_request(MISSING_ARGUMENTS)),
    };

    debug!(city = %city, "Fetching weather");
    match provider.current_weather(&city, &api_key).await {
        Ok(result) => Ok(Json(json!({ "result": result }))),
        Err(error) => {
            warn!(city = %city, error = %error, "Weather provider failed");
            Err(ApiError::new(StatusCode::BAD_GATEWAY, FETCH_FAILED))
        }
    }
}

pub(crate) async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
