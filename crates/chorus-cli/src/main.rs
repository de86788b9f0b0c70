//! chorus
//!
//! Runs one multi-agent conversation: an orchestrator plans and delegates
//! to workers until it calls `Finish`, then the result goes to stdout.

mod app;
mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "chorus", version, about = "Multi-agent orchestration over MCP tool providers")]
struct Cli {
    /// Path to the JSON config file
    #[arg(short, long, env = "CHORUS_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Override the orchestrator turn budget
    #[arg(long)]
    max_turns: Option<usize>,

    /// Override the workspace directory
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// What the agents should accomplish
    #[arg(required = true, trailing_var_arg = true)]
    objective: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        "debug".to_string()
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into())
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let mut config = Config::load(&cli.config)?.with_env(|key| std::env::var(key).ok());
    if let Some(max_turns) = cli.max_turns {
        config.max_turns = max_turns;
    }
    if let Some(workspace) = cli.workspace {
        config.workspace = workspace;
    }
    tracing::info!("✓ Loaded {} agents from {}", config.agents.len(), cli.config.display());

    let objective = cli.objective.join(" ");
    let result = app::run(&config, &objective).await?;
    println!("{result}");

    Ok(())
}
