//! Database connection establishment
//!
//! One connection per call, no pooling: each executor invocation opens a
//! fresh connection and closes it before returning. Statements run outside
//! any explicit transaction, so every statement commits immediately
//! (autocommit); this module never issues a `BEGIN`.

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::ConnectOptions;
use std::str::FromStr;
use std::time::Duration;
use tracing::log::LevelFilter;

use dal_shared::DatabaseConfig;

use crate::error::DbError;

/// Open a connection described by `config`.
///
/// A configured `url` wins; otherwise the options are composed from the
/// individual fields, with unset fields keeping the driver defaults.
/// Connection failure is logged and returned as [`DbError::Connection`]
/// so the caller decides what to do about it.
pub async fn establish_connection(config: &DatabaseConfig) -> Result<PgConnection, DbError> {
    let mut options = connect_options(config)?;

    options = if config.enable_logging {
        options.log_statements(LevelFilter::Debug).log_slow_statements(
            LevelFilter::Warn,
            Duration::from_millis(config.slow_statement_threshold),
        )
    } else {
        options
            .log_statements(LevelFilter::Off)
            .log_slow_statements(LevelFilter::Off, Duration::from_secs(1))
    };

    let attempt = options.connect();
    let result = if config.connect_timeout > 0 {
        match tokio::time::timeout(Duration::from_secs(config.connect_timeout), attempt).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    "Cannot connect to database: timed out after {}s",
                    config.connect_timeout
                );
                return Err(DbError::Timeout(config.connect_timeout));
            }
        }
    } else {
        attempt.await
    };

    match result {
        Ok(connection) => {
            tracing::debug!("Database connection established");
            Ok(connection)
        }
        Err(e) => {
            tracing::error!("Cannot connect to database: {}", e);
            Err(DbError::Connection(e))
        }
    }
}

/// Build driver connect options from the configuration.
fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, DbError> {
    let mut options = match &config.url {
        Some(url) => PgConnectOptions::from_str(url)
            .map_err(|e| DbError::Config(format!("invalid database URL: {}", e)))?,
        None => {
            let mut options = PgConnectOptions::new();
            if let Some(host) = &config.host {
                options = options.host(host);
            }
            if let Some(port) = config.port {
                options = options.port(port);
            }
            if let Some(user) = &config.user {
                options = options.username(user);
            }
            if let Some(password) = &config.password {
                options = options.password(password);
            }
            if let Some(dbname) = &config.dbname {
                options = options.database(dbname);
            }
            options
        }
    };

    if let Some(name) = &config.application_name {
        options = options.application_name(name);
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_a_config_error() {
        let config = DatabaseConfig::new("not a url at all");
        let err = connect_options(&config).unwrap_err();
        match err {
            DbError::Config(msg) => assert!(msg.contains("invalid database URL")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_field_composition_accepts_partial_credentials() {
        // Absent fields stay at driver defaults; composing options must not
        // fail even when everything is missing.
        let empty = DatabaseConfig::default();
        assert!(connect_options(&empty).is_ok());

        let partial = DatabaseConfig::default()
            .with_host("db.internal")
            .with_dbname("appdb");
        assert!(connect_options(&partial).is_ok());
    }

    #[test]
    fn test_url_takes_precedence_over_fields() {
        let config = DatabaseConfig::new("postgres://url_user@url-host:6543/url_db")
            .with_host("field-host")
            .with_user("field_user");
        let options = connect_options(&config).unwrap();
        // PgConnectOptions exposes the host for inspection
        assert_eq!(options.get_host(), "url-host");
    }
}
