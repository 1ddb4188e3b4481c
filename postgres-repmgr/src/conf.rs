//! Generated configuration emission
//!
//! Everything written here is derived state: rewritten from the environment
//! on every boot, never merged with what a previous boot left behind. The
//! single exception is pg_hba.conf, which belongs to the cluster; there we
//! append a marker-guarded block instead of overwriting.

use anyhow::{Context, Result};
use nix::unistd::chown;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::mounts::PG_USER;
use crate::paths;

const MANAGED_HEADER: &str = "# This file is maintained by the postgres-repmgr entrypoint";

const HBA_MARKER: &str = "# Rules appended by the postgres-repmgr entrypoint";

/// Render the PostgreSQL override fragment enabling hot standby and the
/// WAL settings replication needs.
pub fn postgresql_fragment(config: &Config) -> String {
    format!(
        r#"{header}
listen_addresses = '*'
hot_standby = on
wal_level = replica
max_wal_senders = {wal_senders}
wal_log_hints = on
wal_keep_segments = 500
archive_mode = on
archive_command = '/bin/true'

shared_preload_libraries = 'repmgr'
"#,
        header = MANAGED_HEADER,
        wal_senders = config.max_wal_senders(),
    )
}

/// Overwrite the override fragment. The fragment directory is created when
/// absent so a node awaiting its clone still gets configuration.
pub fn write_postgresql_fragment(config: &Config) -> Result<()> {
    let fragment_dir = paths::conf_fragment_dir(&config.pg_major);
    let fragment = paths::conf_fragment(&config.pg_major);
    info!(path = %fragment, "Updating PostgreSQL configuration");

    fs::create_dir_all(&fragment_dir)
        .with_context(|| format!("Failed to create {}", fragment_dir))?;
    fs::write(&fragment, postgresql_fragment(config))
        .with_context(|| format!("Failed to write {}", fragment))?;
    fs::set_permissions(&fragment, fs::Permissions::from_mode(0o644))
        .with_context(|| format!("Failed to chmod {}", fragment))?;

    Ok(())
}

/// Render repmgr.conf for this node. The data directory is passed
/// explicitly: callers reach this only after the PGDATA precondition.
pub fn repmgr_conf(config: &Config, pgdata: &str) -> String {
    let bindir = paths::pg_bindir(&config.pg_major);
    format!(
        r#"{header}

node_id={node_id}
node_name='{node_name}'
data_directory='{pgdata}'

pg_bindir='{bindir}'
repmgr_bindir='{bindir}'

log_level='INFO'
log_facility='STDERR'
log_file='{log_file}'
log_status_interval=300

# Secret pulled from ~/.pgpass
conninfo='host={node_dns} user=repmgr dbname=repmgr connect_timeout=2'

service_start_command   = 'pg_ctlcluster {pg_major} main start'
service_stop_command    = 'pg_ctlcluster {pg_major} main stop'
service_restart_command = 'pg_ctlcluster {pg_major} main restart'
service_reload_command  = 'pg_ctlcluster {pg_major} main reload'
service_promote_command = 'pg_ctlcluster {pg_major} main promote'

primary_visibility_consensus=true
standby_disconnect_on_failover=true
standby_reconnect_timeout=180
node_rejoin_timeout=180

failover=automatic
promote_command='/usr/local/bin/repmgr-promote'
follow_command='/usr/local/bin/repmgr-follow %n'

monitoring_history=yes
"#,
        header = MANAGED_HEADER,
        node_id = config.node_id,
        node_name = config.node_name,
        pgdata = pgdata,
        bindir = bindir,
        log_file = paths::REPMGR_LOG,
        node_dns = config.node_dns,
        pg_major = config.pg_major,
    )
}

/// Overwrite repmgr.conf under the configuration root.
pub fn write_repmgr_conf(config: &Config, pgdata: &str) -> Result<()> {
    info!(path = paths::REPMGR_CONF, "Updating repmgr configuration");

    fs::write(paths::REPMGR_CONF, repmgr_conf(config, pgdata))
        .with_context(|| format!("Failed to write {}", paths::REPMGR_CONF))?;
    fs::set_permissions(paths::REPMGR_CONF, fs::Permissions::from_mode(0o644))
        .with_context(|| format!("Failed to chmod {}", paths::REPMGR_CONF))?;

    Ok(())
}

/// Render a .pgpass granting the repmgr account access to its database and
/// to replication connections.
pub fn pgpass(password: &str) -> String {
    format!(
        r#"{header}
*:*:repmgr:repmgr:{password}
*:*:replication:repmgr:{password}
"#,
        header = MANAGED_HEADER,
        password = password,
    )
}

/// Overwrite the root and postgres .pgpass files from the mounted admin
/// secret, picking up a rotated secret on restart.
pub fn write_pgpass_files(config: &Config) -> Result<()> {
    let password = fs::read_to_string(&config.admin_password_file)
        .with_context(|| format!("Failed to read {}", config.admin_password_file))?;
    let content = pgpass(password.trim());

    for path in [paths::ROOT_PGPASS, paths::POSTGRES_PGPASS] {
        info!(path, "Updating password file");
        fs::write(path, &content).with_context(|| format!("Failed to write {}", path))?;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to chmod {}", path))?;
    }

    let user = nix::unistd::User::from_name(PG_USER)
        .context("Failed to look up postgres user")?
        .context("No postgres user in image")?;
    chown(
        Path::new(paths::POSTGRES_PGPASS),
        Some(user.uid),
        Some(user.gid),
    )
    .with_context(|| format!("Failed to chown {}", paths::POSTGRES_PGPASS))?;

    Ok(())
}

/// Compute the pg_hba.conf content with replication and admin rules
/// appended, or None when the marker shows they are already present.
pub fn append_hba_rules(existing: &str) -> Option<String> {
    if existing.lines().any(|line| line == HBA_MARKER) {
        return None;
    }

    Some(format!(
        r#"{existing}
{marker}
host all         all 0.0.0.0/0 scram-sha-256
host all         all ::0/0     scram-sha-256
host replication all 0.0.0.0/0 scram-sha-256
host replication all ::0/0     scram-sha-256
"#,
        existing = existing,
        marker = HBA_MARKER,
    ))
}

/// Append auth rules to the cluster's pg_hba.conf, once. A missing file is
/// not an error: a standby awaiting its clone has no cluster config yet.
pub fn update_pg_hba(config: &Config) -> Result<()> {
    let path = paths::pg_hba_conf(&config.pg_major);
    if !Path::new(&path).exists() {
        return Ok(());
    }

    let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?;
    if let Some(updated) = append_hba_rules(&content) {
        info!(path = %path, "Appending auth rules to pg_hba.conf");
        fs::write(&path, updated).with_context(|| format!("Failed to write {}", path))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunMode;

    fn test_config() -> Config {
        Config {
            pgdata: Some("/srv/pgdata/12/main".to_string()),
            pg_major: "12".to_string(),
            node_name: "postgres-1".to_string(),
            node_dns: "postgres-1.pg.svc".to_string(),
            node_id: 2,
            expected_peers: vec![
                "postgres-0".to_string(),
                "postgres-1".to_string(),
                "postgres-2".to_string(),
            ],
            mode: RunMode::Hold,
            create_cluster: true,
            post_start_hook: None,
            admin_password_file: "/run/secrets/pgsql-admin-password".to_string(),
        }
    }

    #[test]
    fn fragment_enables_standby_reads_and_replication_wal() {
        let fragment = postgresql_fragment(&test_config());
        assert!(fragment.contains("hot_standby = on"));
        assert!(fragment.contains("wal_level = replica"));
        assert!(fragment.contains("max_wal_senders = 7"));
        assert!(fragment.contains("archive_command = '/bin/true'"));
        assert!(fragment.contains("shared_preload_libraries = 'repmgr'"));
    }

    #[test]
    fn fragment_is_deterministic() {
        let config = test_config();
        assert_eq!(postgresql_fragment(&config), postgresql_fragment(&config));
    }

    #[test]
    fn repmgr_conf_carries_node_identity_and_service_commands() {
        let conf = repmgr_conf(&test_config(), "/srv/pgdata/12/main");
        assert!(conf.contains("node_id=2"));
        assert!(conf.contains("node_name='postgres-1'"));
        assert!(conf.contains("data_directory='/srv/pgdata/12/main'"));
        assert!(conf.contains("conninfo='host=postgres-1.pg.svc user=repmgr dbname=repmgr"));
        assert!(conf.contains("service_start_command   = 'pg_ctlcluster 12 main start'"));
        assert!(conf.contains("follow_command='/usr/local/bin/repmgr-follow %n'"));
    }

    #[test]
    fn pgpass_covers_repmgr_and_replication() {
        let content = pgpass("sekrit");
        assert!(content.contains("*:*:repmgr:repmgr:sekrit"));
        assert!(content.contains("*:*:replication:repmgr:sekrit"));
    }

    #[test]
    fn hba_rules_are_appended_exactly_once() {
        let base = "local all postgres peer\n";
        let updated = append_hba_rules(base).unwrap();
        assert!(updated.starts_with(base));
        assert!(updated.contains("host replication all 0.0.0.0/0 scram-sha-256"));

        // A second pass sees the marker and leaves the file alone
        assert!(append_hba_rules(&updated).is_none());
    }
}
