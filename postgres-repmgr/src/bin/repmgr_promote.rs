//! repmgr promote_command callback
//!
//! Invoked by repmgrd when automatic failover selects this node as the new
//! primary. Orchestrator-side relabeling happens outside the container.

use common::init_logging;
use postgres_repmgr::repmgr;
use tracing::{error, warn};

#[tokio::main]
async fn main() {
    let _guard = init_logging("repmgr-promote");

    warn!("Promoting this node to primary");

    if let Err(e) = repmgr(&["standby", "promote", "-v", "--log-to-file"]).await {
        error!(error = %e, "Promotion failed");
        std::process::exit(1);
    }
}
