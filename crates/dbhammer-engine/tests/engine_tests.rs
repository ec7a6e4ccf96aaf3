//! End-to-end tests for the engine with in-memory collaborators.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dbhammer_core::{
    CallerRole, CoreError, CoreResult, MetadataSource, ProcedureExecutor, ProcedureRow, SqlType,
    SqlValue, SynthesizedCall,
};
use dbhammer_engine::{
    partition, MetadataCatalog, ParameterSynthesizer, PoolReport, WeightedSelector, WorkerPool,
    WorkerSettings, WorkerState,
};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

struct StaticSource {
    rows: Vec<ProcedureRow>,
}

#[async_trait]
impl MetadataSource for StaticSource {
    async fn fetch_rows(&self) -> CoreResult<Vec<ProcedureRow>> {
        Ok(self.rows.clone())
    }
}

struct BrokenSource;

#[async_trait]
impl MetadataSource for BrokenSource {
    async fn fetch_rows(&self) -> CoreResult<Vec<ProcedureRow>> {
        Err(CoreError::connection_unavailable("connection refused"))
    }
}

#[derive(Default)]
struct RecordingExecutor {
    calls: Mutex<Vec<SynthesizedCall>>,
}

#[async_trait]
impl ProcedureExecutor for RecordingExecutor {
    async fn execute(&self, call: &SynthesizedCall, _command_timeout: Duration) -> CoreResult<()> {
        self.calls.lock().push(call.clone());
        Ok(())
    }
}

#[derive(Default)]
struct FailingExecutor {
    attempts: AtomicU64,
}

#[async_trait]
impl ProcedureExecutor for FailingExecutor {
    async fn execute(&self, call: &SynthesizedCall, _command_timeout: Duration) -> CoreResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(CoreError::execution(
            call.procedure.name.clone(),
            "Deadlock found when trying to get lock",
        ))
    }
}

struct HangingExecutor;

#[async_trait]
impl ProcedureExecutor for HangingExecutor {
    async fn execute(&self, _call: &SynthesizedCall, _command_timeout: Duration) -> CoreResult<()> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

fn get_user_rows() -> Vec<ProcedureRow> {
    vec![
        ProcedureRow::parameter("usp_GetUser", Some("User"), 1, "@Id", "int", 0, false),
        ProcedureRow::parameter("usp_GetUser", Some("User"), 2, "@Name", "nvarchar", 50, true),
        ProcedureRow::without_parameters("usp_NightlyRollup", Some("Batch")),
        ProcedureRow::parameter("usp_PurgeAccount", Some("admin"), 1, "@AccountID", "int", 0, true),
    ]
}

fn fast_settings() -> WorkerSettings {
    WorkerSettings {
        command_timeout: Duration::from_secs(1),
        inter_call_delay: Duration::from_millis(5),
        error_backoff: Duration::from_millis(10),
        idle_retry: Duration::from_millis(5),
    }
}

async fn build_pool(executor: Arc<dyn ProcedureExecutor>, rows: Vec<ProcedureRow>) -> WorkerPool {
    let catalog = MetadataCatalog::new(Arc::new(StaticSource { rows }));
    let buckets = Arc::new(partition(catalog.load().await));
    WorkerPool::new(
        buckets,
        WeightedSelector::default(),
        ParameterSynthesizer::default(),
        executor,
        fast_settings(),
    )
}

/// Runs the pool for `run_for`, cancels, and waits at most `stop_within`.
async fn run_then_cancel(
    pool: &WorkerPool,
    workers: usize,
    run_for: Duration,
    stop_within: Duration,
) -> PoolReport {
    let cancel = CancellationToken::new();
    let handle = {
        let pool = pool.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { pool.run(workers, cancel).await })
    };

    tokio::time::sleep(run_for).await;
    cancel.cancel();

    tokio::time::timeout(stop_within, handle)
        .await
        .expect("pool should stop within the bound")
        .expect("pool task should not panic")
}

#[tokio::test]
async fn catalog_groups_get_user_in_parameter_order() {
    let catalog = MetadataCatalog::new(Arc::new(StaticSource {
        rows: get_user_rows(),
    }));

    let procedures = catalog.load().await;
    let names: Vec<_> = procedures.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["usp_GetUser", "usp_NightlyRollup", "usp_PurgeAccount"]);

    let get_user = &procedures[0];
    assert_eq!(get_user.parameters.len(), 2);
    assert_eq!(get_user.parameters[0].name, "@Id");
    assert_eq!(get_user.parameters[0].sql_type, SqlType::Int);
    assert!(!get_user.parameters[0].is_nullable);
    assert_eq!(get_user.parameters[1].name, "@Name");
    assert_eq!(get_user.parameters[1].sql_type, SqlType::NVarChar);
    assert_eq!(get_user.parameters[1].max_length, 50);
    assert!(procedures[1].parameters.is_empty());
}

#[tokio::test]
async fn catalog_loading_is_idempotent() {
    let catalog = MetadataCatalog::new(Arc::new(StaticSource {
        rows: get_user_rows(),
    }));

    let first = catalog.load().await;
    let second = catalog.load().await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn catalog_failure_yields_empty_list() {
    let catalog = MetadataCatalog::new(Arc::new(BrokenSource));

    assert!(catalog.load().await.is_empty());
    let err = catalog.try_load().await.expect_err("load should fail");
    assert!(matches!(err, CoreError::MetadataLoad { .. }));
}

#[tokio::test]
async fn empty_catalog_is_a_load_failure() {
    let catalog = MetadataCatalog::new(Arc::new(StaticSource { rows: Vec::new() }));

    let err = catalog.try_load().await.expect_err("empty catalog should fail");
    assert!(matches!(err, CoreError::MetadataLoad { .. }));
}

#[tokio::test]
async fn partitioned_catalog_fills_role_buckets() {
    let catalog = MetadataCatalog::new(Arc::new(StaticSource {
        rows: get_user_rows(),
    }));
    let buckets = partition(catalog.load().await);

    assert_eq!(buckets.bucket(CallerRole::User).len(), 1);
    assert_eq!(buckets.bucket(CallerRole::Batch).len(), 1);
    assert_eq!(buckets.bucket(CallerRole::Admin).len(), 1);
}

#[tokio::test]
async fn pool_executes_until_cancelled() {
    let executor = Arc::new(RecordingExecutor::default());
    let pool = build_pool(executor.clone(), get_user_rows()).await;

    let report = run_then_cancel(
        &pool,
        4,
        Duration::from_millis(200),
        Duration::from_millis(1_010),
    )
    .await;

    assert_eq!(report.workers.len(), 4);
    assert!(report.executed() > 0);
    assert_eq!(report.failed(), 0);
    assert!(report.all_stopped());
    assert!(pool.states().iter().all(|s| *s == WorkerState::Stopped));

    let calls = executor.calls.lock();
    assert_eq!(calls.len() as u64, report.executed());
    for call in calls.iter() {
        if call.procedure.name == "usp_GetUser" {
            assert!(matches!(call.argument("@Id"), Some(SqlValue::Int(_))));
        }
        if call.procedure.name == "usp_PurgeAccount" {
            assert!(!call.argument("@AccountID").expect("argument").is_null());
        }
    }
}

#[tokio::test]
async fn failing_calls_do_not_stop_workers() {
    let executor = Arc::new(FailingExecutor::default());
    let pool = build_pool(executor.clone(), get_user_rows()).await;

    let report = run_then_cancel(
        &pool,
        3,
        Duration::from_millis(200),
        Duration::from_millis(1_010),
    )
    .await;

    assert_eq!(report.executed(), 0);
    assert_eq!(report.failed(), executor.attempts.load(Ordering::SeqCst));
    for worker in &report.workers {
        assert!(worker.failed >= 2, "worker {} gave up early", worker.worker_id);
        assert_eq!(worker.final_state, WorkerState::Stopped);
    }
}

#[tokio::test]
async fn in_flight_call_is_abandoned_on_cancel() {
    let pool = build_pool(Arc::new(HangingExecutor), get_user_rows()).await;

    let report = run_then_cancel(
        &pool,
        2,
        Duration::from_millis(50),
        Duration::from_millis(500),
    )
    .await;

    assert_eq!(report.executed(), 0);
    assert_eq!(report.failed(), 0);
    assert!(report.all_stopped());
}

#[tokio::test]
async fn empty_buckets_leave_workers_idle() {
    let executor = Arc::new(RecordingExecutor::default());
    let pool = build_pool(executor.clone(), Vec::new()).await;

    let report = run_then_cancel(
        &pool,
        2,
        Duration::from_millis(100),
        Duration::from_millis(500),
    )
    .await;

    assert!(report.idle() > 0);
    assert_eq!(report.executed(), 0);
    assert!(executor.calls.lock().is_empty());
    assert!(report.all_stopped());
}

#[tokio::test]
async fn states_are_empty_before_first_run() {
    let pool = build_pool(Arc::new(RecordingExecutor::default()), get_user_rows()).await;
    assert!(pool.states().is_empty());
}
