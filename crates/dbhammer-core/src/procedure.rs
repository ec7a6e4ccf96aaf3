//! Stored procedure metadata model.

use serde::{Deserialize, Serialize};

use crate::caller::CallerRole;
use crate::sql_type::SqlType;

/// One flattened row of the catalog metadata query.
///
/// A procedure without parameters yields a single row whose parameter
/// columns are all `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureRow {
    pub procedure_name: String,
    pub caller: Option<String>,
    pub parameter_id: Option<i64>,
    pub parameter_name: Option<String>,
    pub type_name: Option<String>,
    pub max_length: Option<i64>,
    pub is_nullable: Option<bool>,
}

impl ProcedureRow {
    /// Row describing a procedure that declares no parameters.
    #[must_use]
    pub fn without_parameters(procedure_name: impl Into<String>, caller: Option<&str>) -> Self {
        Self {
            procedure_name: procedure_name.into(),
            caller: caller.map(str::to_string),
            parameter_id: None,
            parameter_name: None,
            type_name: None,
            max_length: None,
            is_nullable: None,
        }
    }

    /// Row describing one declared parameter of a procedure.
    #[must_use]
    pub fn parameter(
        procedure_name: impl Into<String>,
        caller: Option<&str>,
        parameter_id: i64,
        parameter_name: impl Into<String>,
        type_name: impl Into<String>,
        max_length: i64,
        is_nullable: bool,
    ) -> Self {
        Self {
            procedure_name: procedure_name.into(),
            caller: caller.map(str::to_string),
            parameter_id: Some(parameter_id),
            parameter_name: Some(parameter_name.into()),
            type_name: Some(type_name.into()),
            max_length: Some(max_length),
            is_nullable: Some(is_nullable),
        }
    }
}

/// Schema of a single procedure parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterMetadata {
    /// Parameter name as declared (e.g. `@UserID`).
    pub name: String,
    /// Lower-cased type tag.
    pub sql_type: SqlType,
    /// Character count for character types, 0 when unknown or not applicable.
    pub max_length: u32,
    pub is_nullable: bool,
}

impl ParameterMetadata {
    /// Builds parameter metadata, lower-casing the type name and clamping a
    /// negative length (e.g. `-1` for unbounded types) to 0.
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: &str, max_length: i64, is_nullable: bool) -> Self {
        Self {
            name: name.into(),
            sql_type: SqlType::parse(type_name),
            max_length: u32::try_from(max_length.max(0)).unwrap_or(u32::MAX),
            is_nullable,
        }
    }
}

/// Schema of a callable stored procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureMetadata {
    pub name: String,
    /// Free-form caller tag from the role catalog, if any.
    pub caller: Option<String>,
    /// Parameters in declaration order.
    pub parameters: Vec<ParameterMetadata>,
}

impl ProcedureMetadata {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        caller: Option<String>,
        parameters: Vec<ParameterMetadata>,
    ) -> Self {
        Self {
            name: name.into(),
            caller,
            parameters,
        }
    }

    /// Recognized caller role, if the tag matches one case-insensitively.
    #[must_use]
    pub fn caller_role(&self) -> Option<CallerRole> {
        self.caller.as_deref().and_then(CallerRole::from_tag)
    }

    /// Caller tag for logging; `-` when absent.
    #[must_use]
    pub fn caller_label(&self) -> &str {
        self.caller.as_deref().unwrap_or("-")
    }
}
