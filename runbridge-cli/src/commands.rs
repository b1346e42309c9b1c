//! Command implementations

use crate::error::CliError;
use crate::trip::{TripOptions, run_trip};
use runbridge::core::env::require_env_string;
use runbridge::server::{NamedServer, cancel_on_ctrl_c, launch, serve};
use runbridge::{
    AgentId, AgentRelay, AgentSpec, CancellationToken, DriverConfig, FetchWeatherTool,
    HttpPlatformClient, InMemoryToolRegistry, LaunchConfig, OpenWeatherProvider, PlatformConfig,
    RunDriver, ThreadId, TurnContext, WeatherToolConfig, weather_router,
};
use std::sync::Arc;
use tracing::{info, warn};

const TITLE_INSTRUCTIONS: &str = "You are a helpful writing assistant. \
    Given a topic, reply with one clear and catchy title for a blog post about it.";
const OUTLINE_INSTRUCTIONS: &str = "You are a helpful writing assistant. \
    Given a topic or a title, reply with a short structured outline for a blog post.";

/// Driver configured from the environment.
///
/// The `fetch_weather` tool is registered when `with_weather` is set.
fn driver_from_env(with_weather: bool) -> Result<RunDriver, CliError> {
    let platform = HttpPlatformClient::new(PlatformConfig::from_env()?)?;

    let mut tools = InMemoryToolRegistry::new();
    if with_weather {
        tools.register(Arc::new(FetchWeatherTool::new(WeatherToolConfig::from_env()?)));
    }

    Ok(RunDriver::new(Arc::new(platform), Arc::new(tools)).with_config(DriverConfig::from_env()?))
}

pub async fn trip(when: String, parallel: bool) -> Result<(), CliError> {
    let driver = driver_from_env(true)?;
    let options = TripOptions {
        model: require_env_string("RUNBRIDGE_MODEL")?,
        when,
        parallel,
    };

    // Ctrl+C cancels the active run and still deletes the trip's agents and threads
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let plan = run_trip(&driver, &options, cancel).await?;

    println!("Destinations: {}", plan.cities.join(", "));
    for (city, weather) in &plan.weather {
        println!("\nWeather for {}:\n{}", city, weather);
    }
    for (city, itinerary) in &plan.itineraries {
        println!("\nItinerary for {}:\n{}", city, itinerary);
    }
    Ok(())
}

pub async fn turn(agent: String, thread: Option<String>, message: String) -> Result<(), CliError> {
    let weather_configured = std::env::var_os("OPENWEATHER_API_KEY").is_some();
    let driver = driver_from_env(weather_configured)?;

    let agent_id = AgentId::parse(&agent)?;
    let thread_id = match thread {
        Some(thread) => ThreadId::parse(&thread)?,
        None => {
            let thread_id = driver.platform().create_thread().await?;
            info!(thread_id = %thread_id, "Created thread");
            thread_id
        }
    };

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());
    let outcome = driver
        .run_turn_with_cancel(&TurnContext::new(thread_id.clone(), agent_id), &message, cancel)
        .await?;

    println!("thread: {}", thread_id);
    println!("run: {}", outcome.run_id);
    for invocation in &outcome.tool_invocations {
        println!("tool {} ({}): {}", invocation.name, invocation.tool_call_id, invocation.output);
    }
    println!("\n{}", outcome.text);
    Ok(())
}

pub async fn serve_weather(host: String, port: u16) -> Result<(), CliError> {
    let router = weather_router(Arc::new(OpenWeatherProvider::from_env()));
    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());

    serve("weather", &format!("{}:{}", host, port), router, shutdown).await?;
    Ok(())
}

pub async fn launch_servers() -> Result<(), CliError> {
    let config = LaunchConfig::from_env()?;
    let mut servers = Vec::new();
    let mut relays = Vec::new();

    if let Some(port) = config.weather_port {
        let router = weather_router(Arc::new(OpenWeatherProvider::from_env()));
        servers.push(NamedServer::new("weather_tool_server", config.addr(port), router));
    }

    let relay_ports = [
        ("title_agent_server", "TitleAgent", TITLE_INSTRUCTIONS, config.title_agent_port),
        ("outline_agent_server", "OutlineAgent", OUTLINE_INSTRUCTIONS, config.outline_agent_port),
    ];
    if relay_ports.iter().any(|(_, _, _, port)| port.is_some()) {
        let driver = driver_from_env(false)?;
        let model = require_env_string("RUNBRIDGE_MODEL")?;

        for (server, agent, instructions, port) in relay_ports {
            let Some(port) = port else { continue };
            match AgentRelay::start(server, driver.clone(), &AgentSpec::new(agent, &model, instructions)).await {
                Ok(relay) => {
                    servers.push(NamedServer::new(server, config.addr(port), relay.router()));
                    relays.push(relay);
                }
                Err(e) => warn!(server, error = %e, "Could not create relay agent; server skipped"),
            }
        }
    }

    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());
    let failures = launch(servers, shutdown).await;

    for relay in &relays {
        let report = relay.close().await;
        info!(
            server = relay.name(),
            agents = report.deleted_agents.len(),
            threads = report.deleted_threads.len(),
            "Relay resources deleted"
        );
    }

    if let Some((name, error)) = failures.into_iter().next() {
        warn!(server = %name, "At least one server failed");
        return Err(error.into());
    }
    Ok(())
}
