//! Weather shim served over HTTP against a mocked OpenWeather upstream

use runbridge_server::{OpenWeatherProvider, weather_router};
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Start the shim on an ephemeral port and return its base URL
async fn start_shim(upstream: &MockServer) -> String {
    let provider = Arc::new(OpenWeatherProvider::new(upstream.uri()));
    let router = weather_router(provider);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}

async fn post_weather(base: &str, body: impl Into<reqwest::Body>) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("{}/tools/get_weather", base))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn returns_formatted_weather() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Paris"))
        .and(query_param("appid", "secret"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "weather": [{"description": "clear sky"}],
            "main": {"temp": 22.5}
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let base = start_shim(&upstream).await;
    let (status, body) =
        post_weather(&base, json!({"city": "Paris", "api_key": "secret"}).to_string()).await;

    assert_eq!(status, 200);
    assert_eq!(body, json!({"result": "Weather in Paris: clear sky, Temp: 22.5°C"}));
}

#[tokio::test]
async fn missing_or_empty_arguments_are_rejected() {
    let upstream = MockServer::start().await;
    let base = start_shim(&upstream).await;

    for body in [
        json!({"city": "Paris"}).to_string(),
        json!({"api_key": "secret"}).to_string(),
        json!({"city": "", "api_key": "secret"}).to_string(),
        "not json".to_string(),
    ] {
        let (status, payload) = post_weather(&base, body).await;
        assert_eq!(status, 400);
        assert_eq!(payload, json!({"error": "Missing city or api_key"}));
    }

    assert!(upstream.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn upstream_failure_is_a_bad_gateway() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"cod": 401})))
        .mount(&upstream)
        .await;

    let base = start_shim(&upstream).await;
    let (status, body) =
        post_weather(&base, json!({"city": "Paris", "api_key": "wrong"}).to_string()).await;

    assert_eq!(status, 502);
    assert_eq!(body, json!({"error": "Error fetching weather data."}));
}

#[tokio::test]
async fn health_endpoint() {
    let upstream = MockServer::start().await;
    let base = start_shim(&upstream).await;

    let response = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}
