//! Volume mount ownership and permission repair
//!
//! Mounted volumes lose their ownership and mode across remounts, so every
//! boot forces them back to the layout PostgreSQL expects. All operations
//! here are idempotent: repairing an already-correct mount is a no-op.

use anyhow::{Context, Result};
use nix::unistd::{chown, Gid, Group, Uid, User};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tracing::info;

use crate::paths::{CONF_ROOT, DATA_ROOT, LOG_DIR, SOCKET_DIR, VOLUME_ROOT};

/// Database owner account inside the image
pub const PG_USER: &str = "postgres";

fn lookup_uid(name: &str) -> Result<Uid> {
    User::from_name(name)
        .with_context(|| format!("Failed to look up user {}", name))?
        .map(|u| u.uid)
        .with_context(|| format!("No such user: {}", name))
}

fn lookup_gid(name: &str) -> Result<Gid> {
    Group::from_name(name)
        .with_context(|| format!("Failed to look up group {}", name))?
        .map(|g| g.gid)
        .with_context(|| format!("No such group: {}", name))
}

/// Force ownership and mode on a path.
pub fn repair(path: &str, owner: &str, group: &str, mode: u32) -> Result<()> {
    info!(path, owner, group, mode = %format!("{:o}", mode), "Repairing mount");

    chown(Path::new(path), Some(lookup_uid(owner)?), Some(lookup_gid(group)?))
        .with_context(|| format!("Failed to chown {}", path))?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("Failed to chmod {}", path))?;

    Ok(())
}

/// Create a directory unless it already exists. Returns whether it was created.
pub fn create_if_absent(path: &str, mode: u32) -> Result<bool> {
    if Path::new(path).exists() {
        return Ok(false);
    }
    fs::create_dir(path).with_context(|| format!("Failed to create {}", path))?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("Failed to chmod {}", path))?;
    Ok(true)
}

/// Repair ownership and permissions on the externally provided mounts.
pub fn fix_mounts() -> Result<()> {
    repair(VOLUME_ROOT, "root", PG_USER, 0o775)?;
    repair(LOG_DIR, "root", PG_USER, 0o1775)?;
    repair(SOCKET_DIR, PG_USER, PG_USER, 0o2775)?;
    Ok(())
}

/// Ensure the data and configuration roots exist under the volume,
/// owned by the database user. Never errors when they are already present.
pub fn ensure_volume_dirs() -> Result<()> {
    let uid = lookup_uid(PG_USER)?;
    let gid = lookup_gid(PG_USER)?;

    for path in [DATA_ROOT, CONF_ROOT] {
        if create_if_absent(path, 0o775)? {
            info!(path, "Created volume directory");
        }
        chown(Path::new(path), Some(uid), Some(gid))
            .with_context(|| format!("Failed to chown {}", path))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_if_absent_creates_once() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("pgdata");
        let path = path.to_str().unwrap();

        assert!(create_if_absent(path, 0o775).unwrap());
        assert!(Path::new(path).is_dir());
        // Second run is a no-op, not an error
        assert!(!create_if_absent(path, 0o775).unwrap());
    }

    #[test]
    fn create_if_absent_sets_the_requested_mode() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("pgconf");
        let path = path.to_str().unwrap();

        create_if_absent(path, 0o750).unwrap();
        let mode = fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o750);
    }
}
