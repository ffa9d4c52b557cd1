//! Database layer for myvote-rs.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use myvote_common::{AppError, Config, DatabaseConfig};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;
use tracing::log::LevelFilter;

/// Pool settings derived from the `[database]` section.
#[must_use]
pub fn connect_options(config: &DatabaseConfig) -> ConnectOptions {
    let timeout = Duration::from_secs(config.connect_timeout_secs);
    let mut opt = ConnectOptions::new(config.url.clone());

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .connect_timeout(timeout)
        .acquire_timeout(timeout)
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(config.log_statements)
        .sqlx_logging_level(LevelFilter::Debug);
    opt
}

/// Open the connection pool described by `config.database`.
pub async fn init(config: &Config) -> Result<DatabaseConnection, AppError> {
    let opt = connect_options(&config.database);
    info!(
        max_connections = config.database.max_connections,
        log_statements = config.database.log_statements,
        "Opening database pool"
    );

    Database::connect(opt)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Run pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
    use sea_orm_migration::MigratorTrait;
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database_config() -> DatabaseConfig {
        DatabaseConfig {
            url: "postgres://myvote@localhost/myvote".to_string(),
            max_connections: 4,
            min_connections: 8,
            connect_timeout_secs: 3,
            idle_timeout_secs: 120,
            log_statements: true,
        }
    }

    #[test]
    fn test_connect_options_follow_config() {
        let opt = connect_options(&database_config());

        assert_eq!(opt.get_url(), "postgres://myvote@localhost/myvote");
        assert_eq!(opt.get_max_connections(), Some(4));
        assert_eq!(opt.get_connect_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(opt.get_acquire_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(opt.get_idle_timeout(), Some(Duration::from_secs(120)));
        assert!(opt.get_sqlx_logging());
    }

    #[test]
    fn test_min_connections_never_exceed_max() {
        let opt = connect_options(&database_config());
        assert_eq!(opt.get_min_connections(), Some(4));
    }
}
