use clap::{Parser, Subcommand};

mod commands;
mod error;
mod trip;

use error::CliError;

#[derive(Parser, Debug)]
#[command(name = "runbridge", version)]
#[command(about = "Runbridge CLI - drive hosted agent runs with local tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Research three cities, fetch their weather and draft itineraries
    Trip {
        /// When the trip takes place
        #[arg(long, default_value = "September 2025")]
        when: String,
        /// Look up the weather of every city concurrently, one thread each
        #[arg(long)]
        parallel: bool,
    },
    /// Run one turn against an existing agent
    Turn {
        /// Agent id
        #[arg(long)]
        agent: String,
        /// Thread id (a new thread is created when omitted)
        #[arg(long)]
        thread: Option<String>,
        /// User message
        #[arg(long)]
        message: String,
    },
    /// Serve the weather tool shim
    ServeWeather {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Start every server with a configured port until Ctrl+C
    Launch,
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    // JSON unless a human-readable format is asked for
    let _ = match std::env::var("RUNBRIDGE_LOG_FORMAT").as_deref() {
        Ok("pretty") | Ok("text") => builder.try_init(),
        _ => builder.json().try_init(),
    };
}

async fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Trip { when, parallel } => commands::trip(when, parallel).await,
        Commands::Turn {
            agent,
            thread,
            message,
        } => commands::turn(agent, thread, message).await,
        Commands::ServeWeather { host, port } => commands::serve_weather(host, port).await,
        Commands::Launch => commands::launch_servers().await,
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command).await {
        tracing::error!(error = %e, "Command failed");
        std::process::exit(1);
    }
}
