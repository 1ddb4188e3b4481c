//! Shared components for the postgres-repmgr image binaries
//!
//! This crate implements the container-side bootstrap for images running
//! stock PostgreSQL plus the repmgr replication manager:
//! - Volume mount ownership/permission repair
//! - One-time database cluster initialization
//! - Derived configuration emission (PostgreSQL overrides, repmgr.conf, .pgpass)
//! - repmgrd supervision and the container liveness hold
//! - Database readiness probing for orchestrator health checks

use anyhow::Result;

pub mod bootstrap;
pub mod cluster;
pub mod conf;
pub mod config;
pub mod mounts;
pub mod paths;
pub mod probe;
pub mod supervise;

pub use bootstrap::BootstrapError;
pub use config::{Config, RunMode};

pub use common::{init_logging, ConfigExt};

/// Run a command as the postgres user, preserving the environment.
///
/// The entrypoint runs as root; database tooling (repmgr, repmgrd) must not.
pub async fn as_postgres(args: &[&str]) -> Result<String> {
    let mut full: Vec<&str> = vec!["-u", "postgres", "-EH", "--"];
    full.extend_from_slice(args);
    common::sudo(&full).await
}

/// Run a repmgr subcommand against the generated repmgr.conf.
pub async fn repmgr(args: &[&str]) -> Result<String> {
    let mut full: Vec<&str> = vec!["repmgr", "-f", paths::REPMGR_CONF];
    full.extend_from_slice(args);
    as_postgres(&full).await
}
