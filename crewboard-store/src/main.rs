//! `crewboard` store server.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 127.0.0.1:9400 with no members
//! cargo run --bin crewboard-store
//!
//! # Provision members and bind elsewhere
//! cargo run --bin crewboard-store -- --bind 0.0.0.0:9400 --seed members.toml
//! ```

use std::sync::Arc;

use clap::Parser;
use crewboard_store::config::{StoreCliArgs, StoreConfig};
use crewboard_store::seed;
use crewboard_store::server::{self, StoreState};
use crewboard_store::tables::Tables;

#[tokio::main]
async fn main() {
    let cli = StoreCliArgs::parse();

    let config = match StoreConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let tables = Tables::with_limits(config.max_member_page, config.max_task_page);
    if let Some(path) = &config.seed_file {
        match seed::load_members(path) {
            Ok(members) => {
                tracing::info!(count = members.len(), path = %path.display(), "provisioned members");
                tables.seed_members(members).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load member seed");
                std::process::exit(1);
            }
        }
    }

    tracing::info!(addr = %config.bind_addr, "starting crewboard store");
    let state = Arc::new(StoreState::with_tables(tables));

    match server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "store listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "store server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start store server");
            std::process::exit(1);
        }
    }
}
