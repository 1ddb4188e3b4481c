//! repmgr follow_command callback
//!
//! Invoked by repmgrd after a failover with the new upstream node id as the
//! first argument (repmgr substitutes %n in the configured command).

use common::init_logging;
use postgres_repmgr::repmgr;
use std::env;
use tracing::{error, warn};

#[tokio::main]
async fn main() {
    let _guard = init_logging("repmgr-follow");

    let node_id: u32 = match env::args().nth(1).and_then(|arg| arg.parse().ok()) {
        Some(id) => id,
        None => {
            error!("Usage: repmgr-follow <upstream-node-id>");
            std::process::exit(1);
        }
    };

    warn!(node_id, "Following new upstream node");

    let upstream = format!("--upstream-node-id={}", node_id);
    let args = ["standby", "follow", "-v", "--wait", "--log-to-file", upstream.as_str()];
    if let Err(e) = repmgr(&args).await {
        error!(error = %e, "Follow failed");
        std::process::exit(1);
    }
}
