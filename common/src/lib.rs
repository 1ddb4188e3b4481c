//! Shared utilities for the postgres-repmgr image binaries
//!
//! This crate provides common functionality used across the image binaries:
//! - Structured logging initialization
//! - Environment variable parsing helpers
//! - Command execution utilities

pub mod command;
pub mod config;
pub mod logging;

pub use command::{run, run_checked, sudo, CommandOutput};
pub use config::ConfigExt;
pub use logging::init_logging;
