//! Process lifecycle: the liveness hold and repmgrd supervision
//!
//! The entrypoint never execs over itself. In hold mode it idles forever;
//! in supervise mode it runs repmgrd as a child, forwards termination
//! signals to it, and turns an unexpected child death into a non-zero exit
//! for the orchestrator to act on.

use anyhow::{anyhow, Context, Result};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::paths::REPMGR_CONF;

const IDLE_INTERVAL: Duration = Duration::from_secs(600);

/// Keep the container alive without doing any work.
///
/// Returns only when the orchestrator delivers a stop signal.
pub async fn hold() -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("Bootstrap done, idling to keep the container alive");

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, exiting");
                return Ok(());
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, exiting");
                return Ok(());
            }
            _ = sleep(IDLE_INTERVAL) => {
                debug!("Idling");
            }
        }
    }
}

/// Start repmgrd in the foreground as the postgres user.
pub fn start_repmgrd() -> Result<Child> {
    info!("Starting repmgrd");

    let child = Command::new("sudo")
        .args([
            "-u",
            "postgres",
            "-EH",
            "--",
            "repmgrd",
            "-v",
            "-f",
            REPMGR_CONF,
            "--daemonize=false",
            "--no-pid-file",
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .context("Failed to start repmgrd")?;

    Ok(child)
}

/// Supervise a running repmgrd.
///
/// SIGTERM/SIGINT are forwarded to the child and its shutdown awaited. If
/// the child dies on its own, the supervisor exits with the child's status.
pub async fn supervise(mut child: Child) -> Result<()> {
    let pid = child
        .id()
        .ok_or_else(|| anyhow!("Failed to get repmgrd PID"))?;
    info!(pid, "repmgrd started");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, stopping repmgrd");
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
                let _ = child.wait().await;
                return Ok(());
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, stopping repmgrd");
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
                let _ = child.wait().await;
                return Ok(());
            }
            status = child.wait() => {
                let code = status.ok().and_then(|s| s.code()).unwrap_or(1);
                error!(code, "repmgrd exited unexpectedly");
                std::process::exit(if code == 0 { 1 } else { code });
            }
        }
    }
}
