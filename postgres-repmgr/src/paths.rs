//! Path layout for the PostgreSQL + repmgr image
//!
//! Volume mounts land under /srv; the Debian cluster tooling is configured
//! to keep its configuration tree there instead of /etc/postgresql so that
//! it survives container restarts.

use std::env;

/// Volume root shared by the data and configuration trees
pub const VOLUME_ROOT: &str = "/srv";

/// Root of the PostgreSQL data tree
pub const DATA_ROOT: &str = "/srv/pgdata";

/// Root of the PostgreSQL configuration tree
pub const CONF_ROOT: &str = "/srv/pgconf";

/// PostgreSQL and repmgr log directory
pub const LOG_DIR: &str = "/var/log/postgresql";

/// Runtime socket directory
pub const SOCKET_DIR: &str = "/var/run/postgresql";

/// Generated repmgr configuration
pub const REPMGR_CONF: &str = "/srv/pgconf/repmgr.conf";

/// repmgr daemon log file
pub const REPMGR_LOG: &str = "/var/log/postgresql/repmgr.log";

/// Password files consulted by repmgr/psql for the repmgr account
pub const ROOT_PGPASS: &str = "/root/.pgpass";
pub const POSTGRES_PGPASS: &str = "/var/lib/postgresql/.pgpass";

/// Name of the cluster created by pg_createcluster
pub const CLUSTER_NAME: &str = "main";

/// Get the data directory from the environment, treating empty as unset.
///
/// Existence of this directory is the sole marker of a completed
/// initialization, so the variable is a fatal precondition for the
/// entrypoint.
pub fn pgdata() -> Option<String> {
    env::var("PGDATA").ok().filter(|v| !v.is_empty())
}

/// Configuration directory for the managed cluster
pub fn conf_dir(pg_major: &str) -> String {
    format!("{}/{}/{}", CONF_ROOT, pg_major, CLUSTER_NAME)
}

/// Directory of override fragments read after postgresql.conf
pub fn conf_fragment_dir(pg_major: &str) -> String {
    format!("{}/conf.d", conf_dir(pg_major))
}

/// The override fragment rewritten on every boot
pub fn conf_fragment(pg_major: &str) -> String {
    format!("{}/replication.conf", conf_fragment_dir(pg_major))
}

/// Host-based auth file of the managed cluster
pub fn pg_hba_conf(pg_major: &str) -> String {
    format!("{}/pg_hba.conf", conf_dir(pg_major))
}

/// Binary directory of the installed PostgreSQL major version
pub fn pg_bindir(pg_major: &str) -> String {
    format!("/usr/lib/postgresql/{}/bin", pg_major)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conf_paths_follow_debian_layout() {
        assert_eq!(conf_dir("12"), "/srv/pgconf/12/main");
        assert_eq!(conf_fragment("12"), "/srv/pgconf/12/main/conf.d/replication.conf");
        assert_eq!(pg_hba_conf("12"), "/srv/pgconf/12/main/pg_hba.conf");
        assert_eq!(pg_bindir("12"), "/usr/lib/postgresql/12/bin");
    }
}
