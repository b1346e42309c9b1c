//! # Weather Tool
//!
//! `fetch_weather` forwards a location to the local weather tool server
//! (`POST /tools/get_weather` with `{city, api_key}`) and hands the JSON
//! answer back to the agent.

use reqwest::Client;
use runbridge_core::env::{ConfigError, get_env_string, get_env_u64};
use runbridge_core::{ExecutionResult, Tool};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Name under which the tool is advertised
pub const FETCH_WEATHER: &str = "fetch_weather";

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/tools/get_weather";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Run an async operation to completion from synchronous tool code.
///
/// Must not be called from inside an async task; the driver executes tools
/// on the blocking pool where `Handle::block_on` is allowed. Without a
/// runtime a temporary one is created.
fn run_blocking<Fut>(fut: Fut) -> ExecutionResult
where
    Fut: Future<Output = ExecutionResult>,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle.block_on(fut),
        Err(_) => match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt.block_on(fut),
            Err(e) => ExecutionResult::failure(format!("Failed to create async runtime: {}", e)),
        },
    }
}

/// Configuration for the weather tool
#[derive(Debug, Clone)]
pub struct WeatherToolConfig {
    /// Full URL of the tool server endpoint
    pub endpoint: String,
    /// Key forwarded to the weather provider
    pub api_key: String,
    pub timeout: Duration,
}

impl WeatherToolConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load from `RUNBRIDGE_WEATHER_TOOL_URL`, `OPENWEATHER_API_KEY` and
    /// `RUNBRIDGE_WEATHER_TOOL_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = get_env_string("RUNBRIDGE_WEATHER_TOOL_URL")
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let api_key = runbridge_core::env::require_env_string("OPENWEATHER_API_KEY")?;
        let mut config = Self::new(endpoint, api_key);
        if let Some(secs) = get_env_u64("RUNBRIDGE_WEATHER_TOOL_TIMEOUT_SECS")? {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

#[derive(Serialize)]
struct WeatherRequest<'a> {
    city: &'a str,
    api_key: &'a str,
}

/// Fetches current weather for a location through the weather tool server
pub struct FetchWeatherTool {
    client: Client,
    config: WeatherToolConfig,
}

impl FetchWeatherTool {
    pub fn new(config: WeatherToolConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn fetch(&self, location: &str) -> ExecutionResult {
        let request = WeatherRequest {
            city: location,
            api_key: &self.config.api_key,
        };

        let response = match self
            .client
            .post(&self.config.endpoint)
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return ExecutionResult::failure(format!("Weather request failed: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(location = %location, status = status.as_u16(), "Weather service returned an error");
            return ExecutionResult::failure(format!(
                "Weather service returned HTTP {}: {}",
                status.as_u16(),
                body
            ));
        }

        match response.json::<serde_json::Value>().await {
            Ok(body) => {
                debug!(location = %location, "Fetched weather");
                ExecutionResult::json(&body)
            }
            Err(e) => ExecutionResult::failure(format!("Invalid weather response: {}", e)),
        }
    }
}

impl Tool for FetchWeatherTool {
    fn name(&self) -> &str {
        FETCH_WEATHER
    }

    fn description(&self) -> &str {
        "Fetches the current weather for a city. Returns a JSON weather summary."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "The city name."
                }
            },
            "required": ["location"]
        })
    }

    fn call(&self, arguments: serde_json::Value) -> ExecutionResult {
        let Some(location) = arguments
            .get("location")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            return ExecutionResult::failure("missing required argument 'location'");
        };

        run_blocking(self.fetch(location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool_for(server: &MockServer) -> FetchWeatherTool {
        FetchWeatherTool::new(WeatherToolConfig::new(
            format!("{}/tools/get_weather", server.uri()),
            "test-key",
        ))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn forwards_city_and_key_and_returns_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tools/get_weather"))
            .and(body_json(json!({"city": "Paris", "api_key": "test-key"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"result": "Weather in Paris: clear sky, Temp: 22°C"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tool = tool_for(&server);
        let result = tokio::task::spawn_blocking(move || tool.call(json!({"location": "Paris"})))
            .await
            .unwrap();

        assert!(result.is_success());
        let body: serde_json::Value = serde_json::from_str(result.output()).unwrap();
        assert_eq!(body["result"], "Weather in Paris: clear sky, Temp: 22°C");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn non_success_status_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "Missing city or api_key"})),
            )
            .mount(&server)
            .await;

        let tool = tool_for(&server);
        let result = tokio::task::spawn_blocking(move || tool.call(json!({"location": "Paris"})))
            .await
            .unwrap();

        assert!(result.is_failure());
        assert!(result.output().contains("HTTP 400"));
    }

    #[test]
    fn missing_location_fails_without_a_request() {
        let tool = FetchWeatherTool::new(WeatherToolConfig::new("http://127.0.0.1:9/none", "k"));
        let result = tool.call(json!({"city": "Paris"}));
        assert_eq!(
            result,
            ExecutionResult::failure("missing required argument 'location'")
        );
    }

    #[test]
    fn definition_requires_location() {
        let tool = FetchWeatherTool::new(WeatherToolConfig::new("http://localhost", "k"));
        let definition = tool.definition();
        assert_eq!(definition.name, FETCH_WEATHER);
        assert_eq!(definition.parameters["required"], json!(["location"]));
    }
}
