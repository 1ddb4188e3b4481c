//! Container entrypoint for the PostgreSQL + repmgr image
//!
//! Repairs volume ownership lost across remounts, initializes the database
//! cluster exactly once, rewrites the derived configuration, then either
//! idles to keep the container alive or starts and supervises repmgrd.

use anyhow::Result;
use common::init_logging;
use postgres_repmgr::{bootstrap, supervise, BootstrapError, Config, RunMode};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_logging("docker-entrypoint");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    info!(
        node = %config.node_name,
        pg_major = %config.pg_major,
        mode = ?config.mode,
        "=== PostgreSQL + repmgr entrypoint ==="
    );

    if let Err(e) = bootstrap::run(&config).await {
        match e {
            BootstrapError::MissingEnv(variable) => {
                error!(variable, "Required environment variable is not set");
            }
            BootstrapError::Step { step, ref source } => {
                error!(step, error = %source, "Bootstrap step failed");
            }
        }
        std::process::exit(1);
    }

    match config.mode {
        RunMode::Hold => supervise::hold().await,
        RunMode::Supervise => {
            let child = supervise::start_repmgrd()?;
            supervise::supervise(child).await
        }
    }
}
