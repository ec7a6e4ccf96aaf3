//! Core domain types and traits for the dbhammer load generator.

pub mod caller;
pub mod config;
pub mod error;
pub mod metrics;
pub mod procedure;
pub mod sql_type;
pub mod traits;
pub mod value;

pub use caller::{CallerBuckets, CallerRole};
pub use config::{
    CatalogConfig, DatabaseConfig, HammerConfig, LoggingConfig, SelectionWeights,
    SynthesisConfig, WorkerConfig,
};
pub use error::{CoreError, CoreResult};
pub use procedure::{ParameterMetadata, ProcedureMetadata, ProcedureRow};
pub use sql_type::SqlType;
pub use traits::{MetadataSource, ProcedureExecutor};
pub use value::{SqlValue, SynthesizedCall};
