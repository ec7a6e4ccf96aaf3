use dbhammer_core::{CoreError, CoreResult, MetadataSource, ProcedureRow};
use sqlx::mysql::MySqlRow;
use sqlx::{query, MySqlPool, Row};

use crate::util::quote_identifier;

/// Reads procedure and parameter metadata from `information_schema`.
pub struct MySqlMetadataSource {
    pool: MySqlPool,
    caller_table: Option<String>,
}

impl MySqlMetadataSource {
    /// Creates a source backed by the provided pool.
    ///
    /// `caller_table` names a table with `sp_name` and `caller` columns used
    /// to tag procedures with a caller role.
    pub fn new(pool: MySqlPool, caller_table: Option<String>) -> Self {
        Self { pool, caller_table }
    }

    fn map_row(row: MySqlRow) -> CoreResult<ProcedureRow> {
        let decode = |err: sqlx::Error| CoreError::metadata_load(format!("invalid metadata row: {err}"));

        let procedure_name: String = row.try_get("procedure_name").map_err(decode)?;
        let caller: Option<String> = row.try_get("caller").map_err(decode)?;
        let parameter_id: Option<i64> = row.try_get("parameter_id").map_err(decode)?;
        let parameter_name: Option<String> = row.try_get("parameter_name").map_err(decode)?;
        let type_name: Option<String> = row.try_get("type_name").map_err(decode)?;
        let dtd_identifier: Option<String> = row.try_get("dtd_identifier").map_err(decode)?;
        let max_length: Option<i64> = row.try_get("max_length").map_err(decode)?;
        let is_nullable: Option<i64> = row.try_get("is_nullable").map_err(decode)?;

        Ok(ProcedureRow {
            procedure_name,
            caller,
            parameter_id,
            parameter_name,
            type_name: type_name
                .map(|data_type| parameter_type_name(&data_type, dtd_identifier.as_deref())),
            max_length,
            is_nullable: is_nullable.map(|flag| flag != 0),
        })
    }
}

/// Resolves the type tag for one parameter.
///
/// `DATA_TYPE` drops the `unsigned` attribute, so a bare `tinyint` is only
/// reported as such (0..=255) when `DTD_IDENTIFIER` says unsigned; otherwise
/// it becomes `tinyint signed` (-128..=127).
pub fn parameter_type_name(data_type: &str, dtd_identifier: Option<&str>) -> String {
    let data_type = data_type.trim().to_lowercase();
    let unsigned = dtd_identifier.is_some_and(|dtd| dtd.to_lowercase().contains("unsigned"));
    if data_type == "tinyint" && !unsigned {
        return "tinyint signed".to_string();
    }
    data_type
}

/// Builds the flattened procedure/parameter query.
///
/// Only procedures in the connected schema are returned; `ORDINAL_POSITION 0`
/// (function return values) is excluded. MySQL does not record parameter
/// nullability, so `is_nullable` is always NULL.
pub fn metadata_query(caller_table: Option<&str>) -> String {
    let (caller_column, caller_join) = match caller_table {
        Some(table) => (
            "CAST(c.caller AS CHAR(64))".to_string(),
            format!(
                "LEFT OUTER JOIN {} c ON c.sp_name = r.ROUTINE_NAME",
                quote_identifier(table)
            ),
        ),
        None => ("CAST(NULL AS CHAR(64))".to_string(), String::new()),
    };

    format!(
        r#"
        SELECT CAST(r.ROUTINE_NAME AS CHAR(64)) AS procedure_name,
               {caller_column} AS caller,
               CAST(p.ORDINAL_POSITION AS SIGNED) AS parameter_id,
               CAST(p.PARAMETER_NAME AS CHAR(64)) AS parameter_name,
               CAST(LOWER(p.DATA_TYPE) AS CHAR(64)) AS type_name,
               CAST(LOWER(p.DTD_IDENTIFIER) AS CHAR(255)) AS dtd_identifier,
               CAST(p.CHARACTER_MAXIMUM_LENGTH AS SIGNED) AS max_length,
               CAST(NULL AS SIGNED) AS is_nullable
          FROM information_schema.ROUTINES r
          LEFT OUTER JOIN information_schema.PARAMETERS p
            ON p.SPECIFIC_SCHEMA = r.ROUTINE_SCHEMA
           AND p.SPECIFIC_NAME = r.SPECIFIC_NAME
           AND p.ORDINAL_POSITION > 0
          {caller_join}
         WHERE r.ROUTINE_TYPE = 'PROCEDURE'
           AND r.ROUTINE_SCHEMA = DATABASE()
      ORDER BY r.ROUTINE_NAME ASC, p.ORDINAL_POSITION ASC
        "#
    )
}

#[async_trait::async_trait]
impl MetadataSource for MySqlMetadataSource {
    async fn fetch_rows(&self) -> CoreResult<Vec<ProcedureRow>> {
        let sql = metadata_query(self.caller_table.as_deref());

        let rows = query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| CoreError::metadata_load(err.to_string()))?;

        tracing::debug!(rows = rows.len(), "Fetched procedure metadata rows");

        rows.into_iter().map(Self::map_row).collect()
    }
}
