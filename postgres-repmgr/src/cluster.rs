//! Database cluster initialization and lifecycle
//!
//! The existence of the data directory is the sole marker of a completed
//! initialization. A present directory is never reinitialized, whatever its
//! contents: pg_createcluster on a live data directory means data loss.

use anyhow::{Context, Result};
use common::run_checked;
use nix::unistd::chown;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tracing::{info, warn};

use crate::config::{Config, PG_LOCALE, PG_PORT};
use crate::mounts;
use crate::paths::CLUSTER_NAME;

/// Whether the data directory already holds an initialized cluster.
pub fn cluster_exists(pgdata: &str) -> bool {
    Path::new(pgdata).is_dir()
}

/// Initialize the cluster if, and only if, the data directory is absent.
///
/// Returns whether a new cluster was created. Skipping is the idempotence
/// guarantee for persistent volumes across container restarts; creation can
/// additionally be disabled per node so an orchestrator can restrict
/// initialization to the primary.
pub async fn maybe_create_cluster(config: &Config, pgdata: &str) -> Result<bool> {
    if cluster_exists(pgdata) {
        info!(pgdata, "Database cluster exists, skipping initialization");
        return Ok(false);
    }

    if !config.create_cluster {
        info!(pgdata, "Cluster creation disabled on this node");
        return Ok(false);
    }

    create_cluster(&config.pg_major, pgdata).await?;
    Ok(true)
}

/// Create the data directory and run pg_createcluster against it.
///
/// A failure leaves partially created directories in place for an operator
/// to inspect.
async fn create_cluster(pg_major: &str, pgdata: &str) -> Result<()> {
    warn!(pgdata, "Creating new database cluster");

    // Intermediate directories keep the default 0755; PGDATA itself must be
    // group-readable at most.
    fs::create_dir_all(pgdata).with_context(|| format!("Failed to create {}", pgdata))?;
    let user = nix::unistd::User::from_name(mounts::PG_USER)
        .context("Failed to look up postgres user")?
        .context("No postgres user in image")?;
    chown(Path::new(pgdata), Some(user.uid), Some(user.gid))
        .with_context(|| format!("Failed to chown {}", pgdata))?;
    fs::set_permissions(pgdata, fs::Permissions::from_mode(0o750))
        .with_context(|| format!("Failed to chmod {}", pgdata))?;

    let locale = format!("--locale={}", PG_LOCALE);
    let port = format!("--port={}", PG_PORT);
    let datadir = format!("--datadir={}", pgdata);

    run_checked(
        "pg_createcluster",
        &[
            pg_major,
            CLUSTER_NAME,
            &locale,
            &port,
            &datadir,
            "--",
            "--auth-local=trust",
            "--auth-host=scram-sha-256",
        ],
    )
    .await?;

    info!(pgdata, "Database cluster created");
    Ok(())
}

/// Start the managed cluster through the Debian wrapper.
pub async fn start_cluster(pg_major: &str) -> Result<()> {
    info!("Starting PostgreSQL cluster");
    run_checked("pg_ctlcluster", &[pg_major, CLUSTER_NAME, "start"]).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_means_uninitialized() {
        assert!(!cluster_exists("/nonexistent/pgdata"));
    }

    #[test]
    fn present_directory_means_initialized() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(cluster_exists(tmp.path().to_str().unwrap()));
    }

    #[test]
    fn a_file_at_pgdata_is_not_a_cluster() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("pgdata");
        fs::write(&file, "").unwrap();
        assert!(!cluster_exists(file.to_str().unwrap()));
    }
}
