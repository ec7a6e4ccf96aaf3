use async_trait::async_trait;
use std::time::Duration;

use crate::error::CoreResult;
use crate::procedure::ProcedureRow;
use crate::value::SynthesizedCall;

/// Read-only source of stored procedure metadata.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Returns flattened procedure/parameter rows for every user-defined
    /// procedure, ordered by procedure name then parameter position.
    async fn fetch_rows(&self) -> CoreResult<Vec<ProcedureRow>>;
}

/// Executes synthesized procedure calls against the target database.
#[async_trait]
pub trait ProcedureExecutor: Send + Sync {
    /// Invokes `call.procedure` with its arguments.
    ///
    /// Implementations acquire their own connection for the duration of the
    /// call, release it on every exit path, and fail with
    /// `CoreError::CommandTimeout` once `command_timeout` elapses.
    async fn execute(&self, call: &SynthesizedCall, command_timeout: Duration) -> CoreResult<()>;
}
