use dbhammer_core::{CoreError, DatabaseConfig};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::MySqlPool;

/// Creates a MySQL connection pool sized for the worker pool.
///
/// Connections are opened lazily, so an unreachable server surfaces on first
/// use rather than here.
pub fn create_mysql_pool(database_url: &str, config: &DatabaseConfig) -> Result<MySqlPool, sqlx::Error> {
    let options = database_url.parse::<MySqlConnectOptions>()?;

    Ok(MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect_lazy_with(options))
}

/// Translates a driver error raised while invoking `procedure`.
pub(crate) fn map_sqlx_error(procedure: &str, err: sqlx::Error) -> CoreError {
    match err {
        sqlx::Error::Database(db_err) => CoreError::execution(procedure, db_err.message()),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            CoreError::connection_unavailable(err.to_string())
        }
        sqlx::Error::Io(io_err) => CoreError::connection_unavailable(io_err.to_string()),
        other => CoreError::execution(procedure, other.to_string()),
    }
}

/// Backtick-quotes an identifier, or each part of `schema.name`.
pub(crate) fn quote_identifier(identifier: &str) -> String {
    identifier
        .split('.')
        .map(|part| format!("`{}`", part.replace('`', "``")))
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_each_identifier_part() {
        assert_eq!(quote_identifier("sp_catalog"), "`sp_catalog`");
        assert_eq!(quote_identifier("ops.sp_catalog"), "`ops`.`sp_catalog`");
        assert_eq!(quote_identifier("odd`name"), "`odd``name`");
    }

    #[test]
    fn pool_errors_map_to_connection_unavailable() {
        let err = map_sqlx_error("usp_A", sqlx::Error::PoolTimedOut);
        assert!(matches!(err, CoreError::ConnectionUnavailable { .. }));

        let err = map_sqlx_error("usp_A", sqlx::Error::RowNotFound);
        assert!(matches!(err, CoreError::Execution { ref procedure, .. } if procedure == "usp_A"));
    }
}
