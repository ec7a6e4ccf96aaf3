use std::time::Duration;

use dbhammer_core::{CoreError, CoreResult, ProcedureExecutor, SqlValue, SynthesizedCall};
use sqlx::mysql::{MySqlArguments, MySqlConnection};
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::{MySql, MySqlPool};

use crate::util::{map_sqlx_error, quote_identifier};

/// Invokes stored procedures with `CALL`, one pooled connection per call.
pub struct MySqlProcedureExecutor {
    pool: MySqlPool,
}

impl MySqlProcedureExecutor {
    /// Creates an executor backed by the provided pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// Connection held for one `CALL`.
///
/// Returned to the pool only through [`CallConnection::release`], after the
/// statement finished. Dropped any other way (timeout, or the caller
/// abandoning the future on shutdown) it is detached, so the pool never
/// waits on a statement still running server-side.
struct CallConnection {
    conn: Option<PoolConnection<MySql>>,
}

impl CallConnection {
    fn new(conn: PoolConnection<MySql>) -> Self {
        Self { conn: Some(conn) }
    }

    fn connection(&mut self) -> Option<&mut MySqlConnection> {
        self.conn.as_deref_mut()
    }

    fn release(mut self) {
        drop(self.conn.take());
    }
}

impl Drop for CallConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::debug!("Discarding connection with an unfinished statement");
            drop(conn.detach());
        }
    }
}

/// Builds `CALL `name`(?, ?, ...)` with one placeholder per argument.
pub fn call_statement(procedure: &str, argument_count: usize) -> String {
    let placeholders = vec!["?"; argument_count].join(", ");
    format!("CALL {}({placeholders})", quote_identifier(procedure))
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &SqlValue,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        SqlValue::Null => query.bind(Option::<String>::None),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::BigInt(v) => query.bind(*v),
        SqlValue::TinyInt(v) => query.bind(*v),
        SqlValue::SignedTinyInt(v) => query.bind(*v),
        SqlValue::SmallInt(v) => query.bind(*v),
        SqlValue::Decimal(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Bit(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.clone()),
        SqlValue::DateTime(v) => query.bind(*v),
        SqlValue::Date(v) => query.bind(*v),
        SqlValue::Uuid(v) => query.bind(v.hyphenated().to_string()),
    }
}

#[async_trait::async_trait]
impl ProcedureExecutor for MySqlProcedureExecutor {
    async fn execute(&self, call: &SynthesizedCall, command_timeout: Duration) -> CoreResult<()> {
        let procedure = call.procedure.name.as_str();
        let sql = call_statement(procedure, call.arguments.len());

        // Arguments are stored in declaration order, which is the order
        // MySQL binds CALL placeholders.
        let query = call
            .arguments
            .iter()
            .fold(sqlx::query(&sql), |query, (_, value)| bind_value(query, value));

        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|err| map_sqlx_error(procedure, err))?;
        let mut conn = CallConnection::new(conn);

        let outcome = match conn.connection() {
            Some(raw) => tokio::time::timeout(command_timeout, query.execute(raw)).await,
            None => return Err(CoreError::internal("call connection released before use")),
        };

        match outcome {
            Ok(Ok(_)) => {
                conn.release();
                Ok(())
            }
            Ok(Err(err)) => {
                conn.release();
                Err(map_sqlx_error(procedure, err))
            }
            Err(_) => Err(CoreError::command_timeout(
                procedure,
                command_timeout.as_secs(),
            )),
        }
    }
}
