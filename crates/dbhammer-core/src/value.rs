//! Argument values bound to synthesized procedure calls.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::procedure::ProcedureMetadata;
use crate::sql_type::SqlType;

/// A single bindable argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Int(i32),
    BigInt(i64),
    TinyInt(u8),
    SignedTinyInt(i8),
    SmallInt(i16),
    Decimal(f64),
    Float(f32),
    Bit(bool),
    Text(String),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Uuid(Uuid),
}

impl SqlValue {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Zero value used when a non-nullable parameter would otherwise be null.
    ///
    /// Returns `None` for unrecognized types, which stay null.
    #[must_use]
    pub fn zero_for(sql_type: &SqlType) -> Option<Self> {
        let now = Utc::now();
        let zero = match sql_type {
            SqlType::Int => Self::Int(0),
            SqlType::BigInt => Self::BigInt(0),
            SqlType::TinyInt => Self::TinyInt(0),
            SqlType::SignedTinyInt => Self::SignedTinyInt(0),
            SqlType::SmallInt => Self::SmallInt(0),
            SqlType::Decimal | SqlType::Numeric | SqlType::Money => Self::Decimal(0.0),
            SqlType::Float => Self::Float(0.0),
            SqlType::VarChar | SqlType::NVarChar | SqlType::Char | SqlType::NChar => {
                Self::Text(String::new())
            }
            SqlType::DateTime | SqlType::SmallDateTime | SqlType::DateTime2 => {
                Self::DateTime(now.naive_utc())
            }
            SqlType::Date => Self::Date(now.date_naive()),
            SqlType::Bit => Self::Bit(false),
            SqlType::UniqueIdentifier => Self::Uuid(Uuid::nil()),
            SqlType::Unrecognized(_) => return None,
        };
        Some(zero)
    }
}

/// One synthesized invocation: a procedure plus its generated arguments.
///
/// Arguments are kept in parameter declaration order.
#[derive(Debug, Clone)]
pub struct SynthesizedCall {
    pub procedure: Arc<ProcedureMetadata>,
    pub arguments: Vec<(String, SqlValue)>,
}

impl SynthesizedCall {
    #[must_use]
    pub fn new(procedure: Arc<ProcedureMetadata>, arguments: Vec<(String, SqlValue)>) -> Self {
        Self {
            procedure,
            arguments,
        }
    }

    /// Looks up an argument by parameter name (case-insensitive).
    #[must_use]
    pub fn argument(&self, name: &str) -> Option<&SqlValue> {
        self.arguments
            .iter()
            .find(|(param, _)| param.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Argument set rendered as a compact JSON object for logging.
    #[must_use]
    pub fn arguments_json(&self) -> String {
        let map: Map<String, Value> = self
            .arguments
            .iter()
            .map(|(name, value)| {
                (
                    name.clone(),
                    serde_json::to_value(value).unwrap_or(Value::Null),
                )
            })
            .collect();
        Value::Object(map).to_string()
    }
}
