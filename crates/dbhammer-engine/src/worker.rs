//! Worker pool driving synthesized procedure calls.
//!
//! Each worker loops select → synthesize → execute until the shared
//! cancellation token fires. The catalog snapshot is shared read-only; every
//! call goes through the executor, which owns connection acquisition.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dbhammer_core::metrics;
use dbhammer_core::{CallerBuckets, CoreError, ProcedureExecutor, WorkerConfig};
use parking_lot::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::selector::WeightedSelector;
use crate::synthesizer::ParameterSynthesizer;

/// Lifecycle of a single worker loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Result of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// The call completed.
    Executed,
    /// Nothing could be selected.
    Idle,
    /// The call failed or timed out.
    Failed,
    /// Cancellation was observed before or during the call.
    Cancelled,
}

/// Timing knobs for the worker loop.
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub command_timeout: Duration,
    pub inter_call_delay: Duration,
    pub error_backoff: Duration,
    pub idle_retry: Duration,
}

impl From<&WorkerConfig> for WorkerSettings {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            command_timeout: config.command_timeout(),
            inter_call_delay: config.inter_call_delay(),
            error_backoff: config.error_backoff(),
            idle_retry: config.idle_retry(),
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self::from(&WorkerConfig::default())
    }
}

/// Per-worker counters collected when the worker exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub executed: u64,
    pub failed: u64,
    pub idle: u64,
    pub final_state: WorkerState,
}

impl WorkerReport {
    fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            executed: 0,
            failed: 0,
            idle: 0,
            final_state: WorkerState::Starting,
        }
    }

    fn record(&mut self, outcome: IterationOutcome) {
        match outcome {
            IterationOutcome::Executed => self.executed += 1,
            IterationOutcome::Failed => self.failed += 1,
            IterationOutcome::Idle => self.idle += 1,
            IterationOutcome::Cancelled => {}
        }
    }
}

/// Summary of a whole pool run, ordered by worker id.
#[derive(Debug, Clone, Default)]
pub struct PoolReport {
    pub workers: Vec<WorkerReport>,
}

impl PoolReport {
    pub fn executed(&self) -> u64 {
        self.workers.iter().map(|w| w.executed).sum()
    }

    pub fn failed(&self) -> u64 {
        self.workers.iter().map(|w| w.failed).sum()
    }

    pub fn idle(&self) -> u64 {
        self.workers.iter().map(|w| w.idle).sum()
    }

    pub fn all_stopped(&self) -> bool {
        self.workers
            .iter()
            .all(|w| w.final_state == WorkerState::Stopped)
    }
}

struct PoolInner {
    buckets: Arc<CallerBuckets>,
    selector: WeightedSelector,
    synthesizer: ParameterSynthesizer,
    executor: Arc<dyn ProcedureExecutor>,
    settings: WorkerSettings,
    states: RwLock<Vec<WorkerState>>,
}

/// Fixed-size pool of independent worker loops.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    pub fn new(
        buckets: Arc<CallerBuckets>,
        selector: WeightedSelector,
        synthesizer: ParameterSynthesizer,
        executor: Arc<dyn ProcedureExecutor>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                buckets,
                selector,
                synthesizer,
                executor,
                settings,
                states: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Current state of every worker from the most recent `run`.
    pub fn states(&self) -> Vec<WorkerState> {
        self.inner.states.read().clone()
    }

    /// Runs `worker_count` loops until `cancel` fires and every loop exits.
    pub async fn run(&self, worker_count: usize, cancel: CancellationToken) -> PoolReport {
        *self.inner.states.write() = vec![WorkerState::Starting; worker_count];

        if worker_count == 0 {
            cancel.cancelled().await;
            return PoolReport::default();
        }

        tracing::info!(workers = worker_count, "Starting worker pool");
        let cancel = cancel.child_token();

        let mut join_set = JoinSet::new();
        for index in 0..worker_count {
            let inner = Arc::clone(&self.inner);
            let cancel = cancel.clone();
            join_set.spawn(async move { inner.run_worker(index, cancel).await });
        }

        let mut workers = Vec::with_capacity(worker_count);
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(report) => workers.push(report),
                Err(e) => tracing::error!(error = %e, "Worker task aborted"),
            }
        }
        workers.sort_by_key(|w| w.worker_id);

        let report = PoolReport { workers };
        tracing::info!(
            executed = report.executed(),
            failed = report.failed(),
            idle = report.idle(),
            "Worker pool stopped"
        );
        report
    }
}

impl PoolInner {
    fn set_state(&self, index: usize, state: WorkerState) {
        if let Some(slot) = self.states.write().get_mut(index) {
            *slot = state;
        }
    }

    async fn run_worker(self: Arc<Self>, index: usize, cancel: CancellationToken) -> WorkerReport {
        let worker_id = index + 1;
        let worker = format!("{worker_id:03}");
        let mut report = WorkerReport::new(worker_id);

        self.set_state(index, WorkerState::Running);
        metrics::ACTIVE_WORKERS.inc();
        tracing::info!(worker = %worker, "Worker starting");

        loop {
            let outcome = self.run_iteration(&worker, &cancel).await;
            report.record(outcome);

            let pause = match outcome {
                IterationOutcome::Executed => self.settings.inter_call_delay,
                IterationOutcome::Idle => self.settings.idle_retry,
                IterationOutcome::Failed => self.settings.error_backoff,
                IterationOutcome::Cancelled => break,
            };
            if !sleep_unless_cancelled(pause, &cancel).await {
                break;
            }
        }

        self.set_state(index, WorkerState::Stopping);
        metrics::ACTIVE_WORKERS.dec();
        tracing::info!(
            worker = %worker,
            executed = report.executed,
            failed = report.failed,
            "Worker stopping"
        );

        self.set_state(index, WorkerState::Stopped);
        report.final_state = WorkerState::Stopped;
        tracing::info!(worker = %worker, "Worker graceful termination completed");
        report
    }

    async fn run_iteration(&self, worker: &str, cancel: &CancellationToken) -> IterationOutcome {
        if cancel.is_cancelled() {
            return IterationOutcome::Cancelled;
        }

        let tid = correlation_token();
        let call = {
            let mut rng = rand::thread_rng();
            self.selector
                .select(&self.buckets, &mut rng)
                .map(|procedure| self.synthesizer.synthesize_call(procedure, &mut rng))
        };

        let Some(call) = call else {
            metrics::SELECTION_MISSES.inc();
            tracing::warn!(
                worker,
                tid = %tid,
                error = %CoreError::NoEligibleProcedure,
                "No procedure selected, retrying"
            );
            return IterationOutcome::Idle;
        };

        let procedure = call.procedure.name.as_str();
        let caller = call.procedure.caller_label();
        let params = call.arguments_json();
        tracing::info!(worker, tid = %tid, procedure, caller, params = %params, "Executing procedure");

        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.executor.execute(&call, self.settings.command_timeout) => Some(result),
        };
        let elapsed = started.elapsed();

        match result {
            None => {
                tracing::info!(worker, tid = %tid, procedure, "Call abandoned on shutdown");
                IterationOutcome::Cancelled
            }
            Some(Ok(())) => {
                metrics::record_call(caller, "success", elapsed.as_secs_f64());
                tracing::info!(
                    worker,
                    tid = %tid,
                    procedure,
                    caller,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Procedure completed"
                );
                IterationOutcome::Executed
            }
            Some(Err(e)) => {
                let status = match e {
                    CoreError::CommandTimeout { .. } => "timeout",
                    _ => "failure",
                };
                metrics::record_call(caller, status, elapsed.as_secs_f64());
                tracing::error!(
                    worker,
                    tid = %tid,
                    procedure,
                    caller,
                    params = %params,
                    error = %e,
                    "Procedure call failed"
                );
                IterationOutcome::Failed
            }
        }
    }
}

/// Sleeps for `duration`. Returns false if cancellation fired first.
async fn sleep_unless_cancelled(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Short per-iteration token: the last four hex digits of a random uuid.
fn correlation_token() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[id.len() - 4..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_token_is_four_hex_digits() {
        let tid = correlation_token();
        assert_eq!(tid.len(), 4);
        assert!(tid.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn report_totals_sum_workers() {
        let mut first = WorkerReport::new(1);
        first.record(IterationOutcome::Executed);
        first.record(IterationOutcome::Failed);
        first.final_state = WorkerState::Stopped;
        let mut second = WorkerReport::new(2);
        second.record(IterationOutcome::Executed);
        second.record(IterationOutcome::Idle);
        second.record(IterationOutcome::Cancelled);

        let report = PoolReport {
            workers: vec![first, second],
        };
        assert_eq!(report.executed(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.idle(), 1);
        assert!(!report.all_stopped());
    }

    #[test]
    fn settings_follow_worker_config() {
        let settings = WorkerSettings::default();
        assert_eq!(settings.command_timeout, Duration::from_secs(30));
        assert_eq!(settings.inter_call_delay, Duration::from_millis(800));
        assert_eq!(settings.error_backoff, Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn sleep_stops_on_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!sleep_unless_cancelled(Duration::from_secs(60), &cancel).await);
    }
}
