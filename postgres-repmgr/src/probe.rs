//! Database readiness checking
//!
//! Backs the orchestrator's readiness probe: a stateless check of whether
//! the database currently accepts connections. Runs independently of the
//! entrypoint and shares nothing with it beyond the server it queries.

use common::{run, ConfigExt};
use tracing::debug;

use crate::config::PG_PORT;
use crate::paths::SOCKET_DIR;

/// Connection parameters for the probe
pub struct ProbeConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub dbname: String,
    pub timeout_secs: u64,
}

impl ProbeConfig {
    /// Load probe parameters from the environment, defaulting to the local
    /// socket and the fixed cluster port.
    pub fn from_env() -> Self {
        Self {
            host: String::env_or("PGHOST", SOCKET_DIR),
            port: u16::env_parse("PGPORT", PG_PORT),
            user: String::env_or("PGUSER", "postgres"),
            dbname: String::env_or("PGDATABASE", "postgres"),
            timeout_secs: u64::env_parse("PROBE_TIMEOUT", 3),
        }
    }

    /// Argument vector for pg_isready
    pub fn isready_args(&self) -> Vec<String> {
        vec![
            "-q".to_string(),
            "-h".to_string(),
            self.host.clone(),
            "-p".to_string(),
            self.port.to_string(),
            "-U".to_string(),
            self.user.clone(),
            "-d".to_string(),
            self.dbname.clone(),
            "-t".to_string(),
            self.timeout_secs.to_string(),
        ]
    }
}

/// Whether the database accepts connections right now.
///
/// pg_isready distinguishes rejecting, unreachable, and unattempted with
/// exit codes 1-3; the probe collapses all of them, and a failure to spawn
/// the tool itself, into "not ready".
pub async fn check_ready(config: &ProbeConfig) -> bool {
    let args = config.isready_args();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match run("pg_isready", &args).await {
        Ok(output) => {
            debug!(code = ?output.code, "pg_isready finished");
            output.success
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_probe() -> ProbeConfig {
        ProbeConfig {
            host: "/var/run/postgresql".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            dbname: "postgres".to_string(),
            timeout_secs: 3,
        }
    }

    #[test]
    fn isready_args_carry_every_parameter() {
        let args = test_probe().isready_args();
        assert_eq!(
            args,
            vec!["-q", "-h", "/var/run/postgresql", "-p", "5432", "-U", "postgres", "-d", "postgres", "-t", "3"]
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_not_ready() {
        let config = ProbeConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            timeout_secs: 1,
            ..test_probe()
        };
        assert!(!check_ready(&config).await);
    }
}
