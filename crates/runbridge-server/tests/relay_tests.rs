//! Agent relay and launcher served over HTTP

use runbridge_core::{AgentPlatform, AgentSpec, ThreadId};
use runbridge_driver::{CancellationToken, DriverConfig, PollPolicy, RunDriver};
use runbridge_server::{AgentRelay, NamedServer, ServerError, TurnResponse, launch};
use runbridge_testing::{Operation, RunScript, ScriptedPlatform};
use runbridge_tools::InMemoryToolRegistry;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

fn driver(platform: &Arc<ScriptedPlatform>) -> RunDriver {
    RunDriver::new(platform.clone(), Arc::new(InMemoryToolRegistry::new())).with_config(
        DriverConfig::default()
            .with_poll(PollPolicy::fixed(Duration::from_millis(5)).with_max_polls(20)),
    )
}

async fn start_relay(platform: &Arc<ScriptedPlatform>) -> (AgentRelay, String) {
    start_relay_with(driver(platform)).await
}

async fn start_relay_with(driver: RunDriver) -> (AgentRelay, String) {
    let relay = AgentRelay::start(
        "title",
        driver,
        &AgentSpec::new("title-agent", "gpt-4o", "Produce a title"),
    )
    .await
    .unwrap();
    let router = relay.router();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (relay, format!("http://{}", addr))
}

async fn post_turn(base: &str, body: Value) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("{}/turn", base))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn turn_creates_a_thread_and_returns_the_reply() {
    let platform = Arc::new(ScriptedPlatform::new());
    let (relay, base) = start_relay(&platform).await;

    let (status, body) = post_turn(&base, json!({"message": "A trip to Lisbon"})).await;
    assert_eq!(status, 200);
    let first: TurnResponse = serde_json::from_value(body).unwrap();
    assert_eq!(first.output, "echo: A trip to Lisbon");

    let (status, body) = post_turn(
        &base,
        json!({"message": "Make it shorter", "thread_id": first.thread_id}),
    )
    .await;
    assert_eq!(status, 200);
    let second: TurnResponse = serde_json::from_value(body).unwrap();
    assert_eq!(second.thread_id, first.thread_id);
    assert_ne!(second.run_id, first.run_id);
    assert_eq!(second.output, "echo: Make it shorter");

    let thread = ThreadId::parse(&first.thread_id).unwrap();
    assert_eq!(platform.messages(&thread).len(), 4);
    assert_eq!(relay.tracked_thread_count().await, 0);

    let report = relay.close().await;
    assert!(report.is_clean());
    assert_eq!(report.deleted_agents, vec![relay.agent_id().clone()]);
    assert_eq!(report.deleted_threads, vec![thread]);
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let platform = Arc::new(ScriptedPlatform::new());
    let (relay, base) = start_relay(&platform).await;

    let (status, body) = post_turn(&base, json!({"message": "  "})).await;
    assert_eq!(status, 400);
    assert!(body["error"].is_string());

    let (status, _) = post_turn(&base, json!({"message": "hi", "thread_id": "../etc"})).await;
    assert_eq!(status, 400);

    let (status, _) = post_turn(&base, json!({"text": "wrong field"})).await;
    assert_eq!(status, 400);

    assert_eq!(platform.call_count(Operation::CreateThread), 0);
    assert_eq!(platform.call_count(Operation::CreateRun), 0);
    relay.close().await;
}

#[tokio::test]
async fn run_errors_map_to_gateway_statuses() {
    let platform = Arc::new(
        ScriptedPlatform::new()
            .with_run(RunScript::stuck_in_progress())
            .with_run(RunScript::new().fails("server_error", "model crashed")),
    );
    let (relay, base) = start_relay(&platform).await;

    let (status, body) = post_turn(&base, json!({"message": "slow"})).await;
    assert_eq!(status, 504);
    assert!(body["error"].as_str().unwrap().contains("did not finish"));

    let (status, body) = post_turn(&base, json!({"message": "broken"})).await;
    assert_eq!(status, 502);
    assert!(body["error"].as_str().unwrap().contains("model crashed"));

    relay.close().await;
}

#[tokio::test]
async fn failed_turns_release_their_thread() {
    let platform = Arc::new(ScriptedPlatform::new().with_run(RunScript::stuck_in_progress()));
    let (relay, base) = start_relay(&platform).await;

    let (status, _) = post_turn(&base, json!({"message": "slow"})).await;
    assert_eq!(status, 504);
    let (status, _) = post_turn(&base, json!({"message": "hi", "thread_id": "thread_404"})).await;
    assert_eq!(status, 502);

    assert_eq!(relay.tracked_thread_count().await, 0);
    relay.close().await;
}

#[tokio::test]
async fn client_disconnect_cancels_the_run() {
    let platform = Arc::new(ScriptedPlatform::new().with_run(RunScript::stuck_in_progress()));
    // Polls far outlast the client, so only the disconnect can end the turn
    let patient = RunDriver::new(platform.clone(), Arc::new(InMemoryToolRegistry::new()))
        .with_config(
            DriverConfig::default().with_poll(
                PollPolicy::fixed(Duration::from_millis(20))
                    .with_max_polls(10_000)
                    .with_max_wall_clock(Duration::from_secs(120)),
            ),
        );
    let (relay, base) = start_relay_with(patient).await;
    let thread = platform.create_thread().await.unwrap();

    let impatient = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let dropped = impatient
        .post(format!("{}/turn", base))
        .json(&json!({"message": "slow", "thread_id": thread.as_str()}))
        .send()
        .await;
    assert!(dropped.is_err());

    let mut cancelled = Vec::new();
    for _ in 0..100 {
        cancelled = platform.cancelled_runs();
        if !cancelled.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(cancelled.len(), 1);

    let (status, body) = post_turn(
        &base,
        json!({"message": "Try again", "thread_id": thread.as_str()}),
    )
    .await;
    assert_eq!(status, 200);
    let reply: TurnResponse = serde_json::from_value(body).unwrap();
    assert_eq!(reply.output, "echo: Try again");
    assert_eq!(relay.tracked_thread_count().await, 0);

    relay.close().await;
}

#[tokio::test]
async fn closed_relay_refuses_turns() {
    let platform = Arc::new(ScriptedPlatform::new());
    let (relay, base) = start_relay(&platform).await;
    relay.close().await;

    let (status, _) = post_turn(&base, json!({"message": "hello"})).await;
    assert_eq!(status, 503);
    assert!(platform.agents().is_empty());
}

#[tokio::test]
async fn launcher_keeps_serving_when_one_server_fails() {
    let platform = Arc::new(ScriptedPlatform::new());
    let relay = AgentRelay::start(
        "outline",
        driver(&platform),
        &AgentSpec::new("outline-agent", "gpt-4o", "Produce an outline"),
    )
    .await
    .unwrap();

    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let taken = occupied.local_addr().unwrap().to_string();
    let free = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let free_addr = free.local_addr().unwrap().to_string();
    drop(free);

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(launch(
        vec![
            NamedServer::new("blocked", taken, relay.router()),
            NamedServer::new("outline", free_addr.clone(), relay.router()),
        ],
        shutdown.clone(),
    ));

    let mut served = None;
    for _ in 0..50 {
        if let Ok(response) = reqwest::get(format!("http://{}/health", free_addr)).await {
            served = Some(response.status().as_u16());
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(served, Some(200));

    shutdown.cancel();
    let failures = handle.await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "blocked");
    assert!(matches!(failures[0].1, ServerError::Bind { .. }));

    drop(occupied);
    relay.close().await;
}
