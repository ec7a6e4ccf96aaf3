//! Procedure catalog loading.
//!
//! The catalog is read once at startup. Raw metadata rows are grouped by
//! procedure name into an immutable list that every worker shares.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use dbhammer_core::{CoreError, CoreResult, MetadataSource, ParameterMetadata, ProcedureMetadata, ProcedureRow};

/// Loads procedure metadata through a [`MetadataSource`].
pub struct MetadataCatalog {
    source: Arc<dyn MetadataSource>,
}

impl MetadataCatalog {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self { source }
    }

    /// Loads the catalog, logging any failure and returning an empty list.
    pub async fn load(&self) -> Vec<ProcedureMetadata> {
        tracing::info!("Loading stored procedure metadata from database...");

        match self.try_load().await {
            Ok(procedures) => {
                tracing::info!(count = procedures.len(), "Stored procedure metadata loaded");
                procedures
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load stored procedure metadata");
                Vec::new()
            }
        }
    }

    /// Loads the catalog, failing with `MetadataLoad` when the query errors or
    /// yields no procedures.
    pub async fn try_load(&self) -> CoreResult<Vec<ProcedureMetadata>> {
        let rows = self.source.fetch_rows().await.map_err(|err| match err {
            CoreError::MetadataLoad { .. } => err,
            other => CoreError::metadata_load(other.to_string()),
        })?;

        let procedures = group_rows(rows);
        if procedures.is_empty() {
            return Err(CoreError::metadata_load("no stored procedures found"));
        }
        Ok(procedures)
    }
}

/// Groups flattened metadata rows into procedures.
///
/// Output is ordered by procedure name, parameters by parameter id. The
/// caller tag comes from the first row of each group. Rows without a
/// parameter name carry no parameter; repeated parameter names keep their
/// first occurrence.
pub fn group_rows(rows: Vec<ProcedureRow>) -> Vec<ProcedureMetadata> {
    let mut groups: BTreeMap<String, Vec<ProcedureRow>> = BTreeMap::new();
    for row in rows {
        if row.procedure_name.trim().is_empty() {
            tracing::warn!("Skipping metadata row without a procedure name");
            continue;
        }
        groups.entry(row.procedure_name.clone()).or_default().push(row);
    }

    groups
        .into_iter()
        .map(|(name, mut rows)| {
            let caller = rows.first().and_then(|row| row.caller.clone());
            rows.sort_by_key(|row| row.parameter_id);

            let mut seen = HashSet::new();
            let parameters = rows
                .into_iter()
                .filter_map(|row| {
                    let param_name = row.parameter_name.filter(|n| !n.is_empty())?;
                    if !seen.insert(param_name.to_ascii_lowercase()) {
                        return None;
                    }
                    Some(ParameterMetadata::new(
                        param_name,
                        row.type_name.as_deref().unwrap_or(""),
                        row.max_length.unwrap_or(0),
                        row.is_nullable.unwrap_or(true),
                    ))
                })
                .collect();

            ProcedureMetadata::new(name, caller, parameters)
        })
        .collect()
}
