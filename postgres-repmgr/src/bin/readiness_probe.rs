//! Readiness probe for orchestrator health checks
//!
//! Exits 0 only when the local PostgreSQL server accepts connections.
//! Stateless: safe to schedule independently of the entrypoint.

use common::init_logging;
use postgres_repmgr::probe::{check_ready, ProbeConfig};
use tracing::debug;

#[tokio::main]
async fn main() {
    let _guard = init_logging("readiness-probe");

    let config = ProbeConfig::from_env();
    let ready = check_ready(&config).await;

    debug!(host = %config.host, port = config.port, ready, "Probe finished");
    std::process::exit(if ready { 0 } else { 1 });
}
