//! # Runbridge Server
//!
//! HTTP surfaces around the run driver:
//!
//! - [`weather`]: the weather tool shim called by the `fetch_weather` tool
//! - [`relay`]: one hosted agent exposed over `POST /turn`
//! - [`launcher`]: several of the above served side by side until Ctrl+C

pub mod error;
pub mod launcher;
pub mod relay;
pub mod weather;

pub use error::{ApiError, ServerError};
pub use launcher::{LaunchConfig, NamedServer, cancel_on_ctrl_c, launch, serve};
pub use relay::{AgentRelay, TurnRequest, TurnResponse};
pub use weather::{OpenWeatherProvider, WeatherError, WeatherProvider, weather_router};
