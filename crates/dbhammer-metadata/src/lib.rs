//! MySQL adapters for the dbhammer load generator.

mod catalog_source;
mod executor;
mod util;

pub use catalog_source::{metadata_query, parameter_type_name, MySqlMetadataSource};
pub use executor::{call_statement, MySqlProcedureExecutor};
pub use util::create_mysql_pool;
