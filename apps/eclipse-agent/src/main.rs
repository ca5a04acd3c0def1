//! Eclipse Agent
//!
//! Command-line front end for the virtual display subsystem. Each
//! invocation runs one command and prints a JSON result on stdout; logs go
//! to stderr.

mod commands;
mod config;
mod restart;
mod state;

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use crate::commands::Command;
use crate::config::AgentConfig;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "eclipse-agent", version, about = "Virtual display driver control")]
struct Cli {
    /// Config file (defaults to the per-user Eclipse config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("eclipse_agent=debug".parse()?)
                .add_directive("vdd_driver=info".parse()?)
                .add_directive("display_config=info".parse()?)
                .add_directive("device_detector=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Eclipse agent");

    let config = AgentConfig::load(cli.config.as_deref())?;
    let state = AppState::new(&config);

    let response = commands::execute(&state, cli.command).await;
    println!("{}", serde_json::to_string(&response)?);

    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}
