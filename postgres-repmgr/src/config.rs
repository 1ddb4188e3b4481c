//! Entrypoint configuration from environment variables

use anyhow::{bail, Context, Result};
use common::ConfigExt;
use std::env;

/// Port the managed cluster listens on
pub const PG_PORT: u16 = 5432;

/// Locale passed to pg_createcluster
pub const PG_LOCALE: &str = "en_US.UTF-8";

/// What the entrypoint does after bootstrap completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Idle forever, keeping the container alive. Cluster start and repmgr
    /// registration are left to the orchestrator.
    Hold,
    /// Start the cluster and run repmgrd as a supervised child.
    Supervise,
}

impl RunMode {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "hold" => Ok(Self::Hold),
            "supervise" => Ok(Self::Supervise),
            other => bail!("Invalid ENTRYPOINT_MODE: {} (expected hold or supervise)", other),
        }
    }
}

/// Configuration for the bootstrap entrypoint
pub struct Config {
    /// Data directory. Optional here; the bootstrap pipeline turns its
    /// absence into the fatal exit-1 precondition.
    pub pgdata: Option<String>,
    pub pg_major: String,
    /// Stable pod name of the form `app-N`
    pub node_name: String,
    /// Hostname other nodes use to reach this one
    pub node_dns: String,
    /// repmgr node id, derived from the pod ordinal
    pub node_id: u32,
    /// Peer pod names, used to size max_wal_senders
    pub expected_peers: Vec<String>,
    pub mode: RunMode,
    /// Whether this node may initialize a fresh cluster. Orchestrators that
    /// want primary-only initialization disable this on standbys.
    pub create_cluster: bool,
    /// Command run after the cluster starts in supervise mode, before
    /// repmgrd. Extension point for registration/cloning sequencing.
    pub post_start_hook: Option<String>,
    /// Mounted secret holding the repmgr admin password
    pub admin_password_file: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let pg_major = String::env_required("PG_MAJOR")?;
        let node_name = String::env_or("POD_NAME", "postgres-0");
        let node_id = pod_ordinal(&node_name)? + 1;

        Ok(Self {
            pgdata: crate::paths::pgdata(),
            pg_major,
            node_dns: String::env_or("POD_DNS", &node_name),
            node_id,
            node_name,
            expected_peers: env::var("EXPECTED_PEERS")
                .unwrap_or_default()
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            mode: RunMode::parse(&String::env_or("ENTRYPOINT_MODE", "hold"))?,
            create_cluster: bool::env_bool("BOOTSTRAP_CREATE_CLUSTER", true),
            post_start_hook: env::var("POST_START_HOOK").ok().filter(|v| !v.is_empty()),
            admin_password_file: String::env_or(
                "ADMIN_PASSWORD_FILE",
                "/run/secrets/pgsql-admin-password",
            ),
        })
    }

    /// WAL sender slots: one per peer plus two for repmgr plus slack,
    /// falling back to a fixed count when the peer list is unknown.
    pub fn max_wal_senders(&self) -> usize {
        if self.expected_peers.is_empty() {
            10
        } else {
            self.expected_peers.len() + 4
        }
    }
}

/// Ordinal of a pod named `app-N`
fn pod_ordinal(name: &str) -> Result<u32> {
    name.rsplit('-')
        .next()
        .and_then(|suffix| suffix.parse().ok())
        .with_context(|| format!("Pod name {} has no numeric ordinal suffix", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_comes_from_the_name_suffix() {
        assert_eq!(pod_ordinal("postgres-0").unwrap(), 0);
        assert_eq!(pod_ordinal("pg-cluster-12").unwrap(), 12);
    }

    #[test]
    fn ordinal_requires_a_numeric_suffix() {
        assert!(pod_ordinal("postgres").is_err());
        assert!(pod_ordinal("postgres-a").is_err());
    }

    #[test]
    fn run_mode_parsing() {
        assert_eq!(RunMode::parse("hold").unwrap(), RunMode::Hold);
        assert_eq!(RunMode::parse("supervise").unwrap(), RunMode::Supervise);
        assert!(RunMode::parse("exec").is_err());
    }

    fn config_with_peers(peers: &[&str]) -> Config {
        Config {
            pgdata: Some("/srv/pgdata/12/main".to_string()),
            pg_major: "12".to_string(),
            node_name: "postgres-0".to_string(),
            node_dns: "postgres-0".to_string(),
            node_id: 1,
            expected_peers: peers.iter().map(|p| p.to_string()).collect(),
            mode: RunMode::Hold,
            create_cluster: true,
            post_start_hook: None,
            admin_password_file: "/run/secrets/pgsql-admin-password".to_string(),
        }
    }

    #[test]
    fn wal_senders_scale_with_peers() {
        assert_eq!(config_with_peers(&[]).max_wal_senders(), 10);
        assert_eq!(
            config_with_peers(&["postgres-0", "postgres-1", "postgres-2"]).max_wal_senders(),
            7
        );
    }
}
