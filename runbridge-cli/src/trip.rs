//! Trip planning workflow
//!
//! A researcher agent picks three cities, a weather agent looks up each
//! city's weather through the `fetch_weather` tool, and a planner agent
//! drafts a one-day itinerary per city. The agents and threads are deleted
//! afterwards whether the workflow succeeded, failed or was cancelled.

use runbridge::{
    AgentId, AgentSpec, CancellationToken, RunDriver, RunError, ThreadId, TurnContext,
    WorkflowSession,
};
use serde::Deserialize;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum TripError {
    #[error(transparent)]
    Run(#[from] RunError),

    #[error("Researcher reply is not a city list ({reason}): {reply}")]
    Cities { reason: String, reply: String },

    #[error("Weather lookup task failed: {0}")]
    Task(String),
}

/// Workflow parameters
#[derive(Debug, Clone)]
pub struct TripOptions {
    /// Model deployment used by all three agents
    pub model: String,
    /// When the trip takes place, e.g. "September 2025"
    pub when: String,
    /// Look up each city's weather on its own thread, concurrently
    pub parallel: bool,
}

/// Outcome of a trip workflow
#[derive(Debug, Clone, Default)]
pub struct TripPlan {
    pub cities: Vec<String>,
    /// Weather reply per city, in city order
    pub weather: Vec<(String, String)>,
    /// Itinerary per city, in city order
    pub itineraries: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct CityList {
    cities: Vec<String>,
}

fn researcher_spec(model: &str, when: &str) -> AgentSpec {
    AgentSpec::new(
        "ResearcherAgent",
        model,
        format!(
            "Research potential destinations for a trip to Europe in {}. Suggest 3 cities.",
            when
        ),
    )
}

fn weather_spec(model: &str, driver: &RunDriver) -> AgentSpec {
    AgentSpec::new(
        "WeatherAgent",
        model,
        "Fetch weather forecasts for given cities using the fetch_weather tool.",
    )
    .with_tools(driver.tools().definitions())
}

fn planner_spec(model: &str) -> AgentSpec {
    AgentSpec::new(
        "PlannerAgent",
        model,
        "Compile destinations and weather into a short Markdown itinerary.",
    )
}

/// Run the workflow, then delete everything it created.
///
/// Cancelling `cancel` cancels the active runs and ends the workflow with
/// [`RunError::Cancelled`].
pub async fn run_trip(
    driver: &RunDriver,
    options: &TripOptions,
    cancel: CancellationToken,
) -> Result<TripPlan, TripError> {
    let mut session = WorkflowSession::for_driver(driver);
    let result = plan(driver, &mut session, options, &cancel).await;

    let report = session.close().await;
    if !report.is_clean() {
        warn!(failures = report.failures.len(), "Some trip resources could not be deleted");
    }
    result
}

async fn plan(
    driver: &RunDriver,
    session: &mut WorkflowSession,
    options: &TripOptions,
    cancel: &CancellationToken,
) -> Result<TripPlan, TripError> {
    let researcher = session
        .create_agent(&researcher_spec(&options.model, &options.when))
        .await?;
    let weather_agent = session
        .create_agent(&weather_spec(&options.model, driver))
        .await?;
    let planner = session.create_agent(&planner_spec(&options.model)).await?;
    let thread = session.create_thread().await?;

    let research = driver
        .run_turn_with_cancel(
            &TurnContext::new(thread.clone(), researcher.id),
            &format!(
                "Pick three cities in Europe for a trip in {}. Respond only with a JSON object \
                 with a 'cities' property containing an array of city names.",
                options.when
            ),
            cancel.clone(),
        )
        .await?;
    let cities = parse_cities(&research.text)?;
    info!(cities = ?cities, "Destinations chosen");

    let weather = if options.parallel {
        let mut threads = Vec::with_capacity(cities.len());
        for _ in &cities {
            threads.push(session.create_thread().await?);
        }
        weather_in_parallel(driver, &weather_agent.id, &cities, threads, &options.when, cancel)
            .await?
    } else {
        let mut weather = Vec::with_capacity(cities.len());
        for city in &cities {
            let outcome = driver
                .run_turn_with_cancel(
                    &TurnContext::new(thread.clone(), weather_agent.id.clone()),
                    &weather_prompt(city, &options.when),
                    cancel.clone(),
                )
                .await?;
            weather.push((city.clone(), outcome.text));
        }
        weather
    };

    let mut itineraries = Vec::with_capacity(cities.len());
    for (city, forecast) in &weather {
        let outcome = driver
            .run_turn_with_cancel(
                &TurnContext::new(thread.clone(), planner.id.clone()),
                &format!(
                    "Create a short 1-day itinerary for a trip to {} in {}. \
                     Include destinations and weather data: {}",
                    city, options.when, forecast
                ),
                cancel.clone(),
            )
            .await?;
        itineraries.push((city.clone(), outcome.text));
    }

    Ok(TripPlan {
        cities,
        weather,
        itineraries,
    })
}

fn weather_prompt(city: &str, when: &str) -> String {
    format!("Get weather for {} in {}.", city, when)
}

async fn weather_in_parallel(
    driver: &RunDriver,
    agent_id: &AgentId,
    cities: &[String],
    threads: Vec<ThreadId>,
    when: &str,
    cancel: &CancellationToken,
) -> Result<Vec<(String, String)>, TripError> {
    // Cancelled on the first failure so sibling runs are cancelled too
    let lookups = cancel.child_token();
    let mut tasks = JoinSet::new();
    for (index, (city, thread)) in cities.iter().zip(threads).enumerate() {
        let driver = driver.clone();
        let ctx = TurnContext::new(thread, agent_id.clone());
        let prompt = weather_prompt(city, when);
        let cancel = lookups.clone();
        tasks.spawn(async move {
            (index, driver.run_turn_with_cancel(&ctx, &prompt, cancel).await)
        });
    }

    let mut replies: Vec<Option<String>> = vec![None; cities.len()];
    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let error = match joined {
            Ok((index, Ok(outcome))) => {
                replies[index] = Some(outcome.text);
                continue;
            }
            Ok((_, Err(e))) => TripError::Run(e),
            Err(e) => TripError::Task(e.to_string()),
        };
        lookups.cancel();
        first_error.get_or_insert(error);
    }
    if let Some(error) = first_error {
        return Err(error);
    }

    Ok(cities
        .iter()
        .cloned()
        .zip(replies.into_iter().map(Option::unwrap_or_default))
        .collect())
}

/// City names from the researcher's reply.
///
/// Accepts `{"cities": [...]}`, optionally inside a markdown code fence.
pub fn parse_cities(reply: &str) -> Result<Vec<String>, TripError> {
    let invalid = |reason: String| TripError::Cities {
        reason,
        reply: reply.to_string(),
    };

    let body = strip_code_fence(reply);
    let list: CityList = match serde_json::from_str(body) {
        Ok(list) => list,
        Err(first) => match (body.find('{'), body.rfind('}')) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str(&body[start..=end]).map_err(|e| invalid(e.to_string()))?
            }
            _ => return Err(invalid(first.to_string())),
        },
    };

    let cities: Vec<String> = list
        .cities
        .into_iter()
        .map(|city| city.trim().to_string())
        .filter(|city| !city.is_empty())
        .collect();
    if cities.is_empty() {
        return Err(invalid("no cities listed".into()));
    }
    Ok(cities)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (```json)
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    rest.trim_end().trim_end_matches("```").trim()
}
