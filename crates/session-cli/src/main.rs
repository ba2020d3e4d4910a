//! sessionctl
//!
//! Command-line front end for the session coordination engine.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use serde_json::json;

use session_coordination::{CoordinationSettings, DependencyState, SessionCoordinator};
use session_core::{
    config::{load_config, CoordinatorConfig},
    logging::{init_logging, LogConfig},
};
use session_registry::SessionRegistry;
use session_store::open_store;

mod cli;

use cli::{Cli, Commands};

const DEMO_WORKERS: [&str; 4] = ["W1", "W2", "W3", "W4"];
const DEMO_GROUP: &str = "pipeline";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => CoordinatorConfig::default(),
    };

    let mut log_config = LogConfig::from(&config.logging);
    log_config.json |= cli.json_logs;
    init_logging(log_config);

    let store = open_store(&config.store)
        .await
        .context("opening state store")?;
    let settings = CoordinationSettings::from(&config.coordination);

    match cli.command {
        Commands::Stats => {
            let coordinator =
                SessionCoordinator::restore(store, SessionRegistry::new(), settings).await?;
            print_json(&coordinator.get_coordination_stats())
        }
        Commands::Demo => {
            let registry = SessionRegistry::new();
            for worker in DEMO_WORKERS {
                registry.initialize_session(worker)?;
            }
            let coordinator = SessionCoordinator::restore(store, registry, settings).await?;
            cmd_demo(&coordinator).await
        }
    }
}

/// W2 waits on W1, W3 on W2, W4 on both W2 and W3
async fn cmd_demo(coordinator: &SessionCoordinator) -> anyhow::Result<()> {
    let [w1, w2, w3, w4] = DEMO_WORKERS;

    coordinator.register_dependency(w2, [w1]).await;
    coordinator.register_dependency(w3, [w2]).await;
    coordinator.register_dependency(w4, [w2, w3]).await;
    coordinator
        .create_session_group(DEMO_GROUP, DEMO_WORKERS, w1)
        .await?;
    coordinator
        .update_session_group_state(DEMO_GROUP, "active")
        .await;

    for worker in [w1, w2, w3] {
        coordinator
            .update_dependency_state(worker, DependencyState::Completed)
            .await;
        tracing::info!("{} completed", worker);
    }

    let chain = coordinator.get_dependency_chain(w4);
    let shared = coordinator
        .share_group_state(DEMO_GROUP, "done", &true, w1)
        .await;
    coordinator
        .update_session_group_state(DEMO_GROUP, "completed")
        .await;

    print_json(&json!({
        "chain": chain,
        "groupWrite": shared,
        "done": coordinator.get_group_state(DEMO_GROUP, "done"),
        "stats": coordinator.get_coordination_stats(),
    }))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
