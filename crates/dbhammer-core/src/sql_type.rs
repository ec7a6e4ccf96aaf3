use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL parameter type tag as reported by the database catalog.
///
/// Parsing is case-insensitive. Tags the generator does not know are kept
/// verbatim in [`SqlType::Unrecognized`] so they can still be logged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlType {
    Int,
    BigInt,
    VarChar,
    NVarChar,
    Char,
    NChar,
    DateTime,
    SmallDateTime,
    DateTime2,
    Date,
    Decimal,
    Numeric,
    Money,
    Float,
    Bit,
    UniqueIdentifier,
    TinyInt,
    /// Signed one-byte integer (MySQL `tinyint` without `unsigned`).
    SignedTinyInt,
    SmallInt,
    /// Any type tag outside the supported set (lower-cased).
    Unrecognized(String),
}

impl SqlType {
    /// Parses a catalog type name, lower-casing it first.
    #[must_use]
    pub fn parse(type_name: &str) -> Self {
        let lowered = type_name.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "int" => Self::Int,
            "bigint" => Self::BigInt,
            "varchar" => Self::VarChar,
            "nvarchar" => Self::NVarChar,
            "char" => Self::Char,
            "nchar" => Self::NChar,
            "datetime" => Self::DateTime,
            "smalldatetime" => Self::SmallDateTime,
            "datetime2" => Self::DateTime2,
            "date" => Self::Date,
            "decimal" => Self::Decimal,
            "numeric" => Self::Numeric,
            "money" => Self::Money,
            "float" => Self::Float,
            "bit" => Self::Bit,
            "uniqueidentifier" => Self::UniqueIdentifier,
            "tinyint" => Self::TinyInt,
            "tinyint signed" => Self::SignedTinyInt,
            "smallint" => Self::SmallInt,
            _ => Self::Unrecognized(lowered),
        }
    }

    /// Returns the canonical lower-case tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::VarChar => "varchar",
            Self::NVarChar => "nvarchar",
            Self::Char => "char",
            Self::NChar => "nchar",
            Self::DateTime => "datetime",
            Self::SmallDateTime => "smalldatetime",
            Self::DateTime2 => "datetime2",
            Self::Date => "date",
            Self::Decimal => "decimal",
            Self::Numeric => "numeric",
            Self::Money => "money",
            Self::Float => "float",
            Self::Bit => "bit",
            Self::UniqueIdentifier => "uniqueidentifier",
            Self::TinyInt => "tinyint",
            Self::SignedTinyInt => "tinyint signed",
            Self::SmallInt => "smallint",
            Self::Unrecognized(raw) => raw.as_str(),
        }
    }
}

impl Default for SqlType {
    fn default() -> Self {
        Self::Unrecognized(String::new())
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
