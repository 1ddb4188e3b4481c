//! The bootstrap pipeline
//!
//! A strictly sequential run of steps, each a precondition for the next.
//! The first failing step aborts the whole run, surfacing the step name and
//! the underlying tool diagnostic. There are no retries: restart-on-failure
//! belongs to the container orchestrator.

use thiserror::Error;
use tracing::info;

use crate::config::{Config, RunMode};
use crate::{cluster, conf, mounts};

/// Why a bootstrap run aborted.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Fatal precondition, reported with exit status 1.
    #[error("required environment variable {0} is not set")]
    MissingEnv(&'static str),

    /// A named pipeline step failed; carries the tool's own diagnostic.
    #[error("bootstrap step `{step}` failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

fn step<T>(name: &'static str, result: anyhow::Result<T>) -> Result<T, BootstrapError> {
    result.map_err(|source| BootstrapError::Step { step: name, source })
}

/// Run the bootstrap sequence up to the point where the entrypoint either
/// idles or starts supervising repmgrd.
///
/// Order matters: mounts are repaired before anything touches them, the
/// data-directory precondition is checked before any mutation of the data
/// directory, and configuration is emitted only for an initialized (or
/// initializable) layout.
pub async fn run(config: &Config) -> Result<(), BootstrapError> {
    step("fix-mounts", mounts::fix_mounts())?;
    step("ensure-volume-dirs", mounts::ensure_volume_dirs())?;

    let pgdata = config
        .pgdata
        .as_deref()
        .ok_or(BootstrapError::MissingEnv("PGDATA"))?;

    if config.mode == RunMode::Supervise {
        step("write-pgpass", conf::write_pgpass_files(config))?;
        step("write-repmgr-conf", conf::write_repmgr_conf(config, pgdata))?;
    }

    step(
        "create-cluster",
        cluster::maybe_create_cluster(config, pgdata).await,
    )?;

    step(
        "write-postgresql-conf",
        conf::write_postgresql_fragment(config),
    )?;

    if config.mode == RunMode::Supervise {
        step("update-pg-hba", conf::update_pg_hba(config))?;
        step("start-cluster", cluster::start_cluster(&config.pg_major).await)?;

        if let Some(hook) = &config.post_start_hook {
            info!(hook = %hook, "Running post-start hook");
            step(
                "post-start-hook",
                common::run_checked("sh", &["-c", hook.as_str()])
                    .await
                    .map(|_| ()),
            )?;
        }
    }

    info!(pgdata, "Bootstrap complete");
    Ok(())
}
