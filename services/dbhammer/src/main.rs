mod cli;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dbhammer_core::{metrics, CallerRole, HammerConfig};
use dbhammer_engine::{
    partition, MetadataCatalog, ParameterSynthesizer, WeightedSelector, WorkerPool, WorkerSettings,
};
use dbhammer_metadata::{create_mysql_pool, MySqlMetadataSource, MySqlProcedureExecutor};
use tokio_util::sync::CancellationToken;

use cli::{Cli, CliAction};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = match Cli::from_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => err.exit(),
    };

    match cli.action() {
        CliAction::PrintInfo => {
            print!("{}", cli::info_banner());
            return Ok(());
        }
        CliAction::PrintHelp => {
            println!("{}", cli::help_text());
            return Ok(());
        }
        CliAction::Run => {}
    }

    let config = HammerConfig::load().context("Failed to load configuration")?;
    telemetry::init_logging(&config.logging);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        workers = config.worker.count,
        "dbhammer starting"
    );

    let Some(database_url) = config.database.url.as_deref() else {
        tracing::error!("database.url is not configured (set DBHAMMER_DATABASE__URL)");
        return Ok(());
    };

    if config.worker.count > config.database.max_connections as usize {
        tracing::warn!(
            workers = config.worker.count,
            max_connections = config.database.max_connections,
            "More workers than pooled connections; workers will queue for connections"
        );
    }

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    if !startup_countdown(config.worker.startup_countdown_secs, &cancel).await {
        tracing::warn!("Shutdown requested during startup countdown");
        return Ok(());
    }

    let db_pool = create_mysql_pool(database_url, &config.database)
        .context("Failed to create MySQL connection pool")?;

    let source = Arc::new(MySqlMetadataSource::new(
        db_pool.clone(),
        config.catalog.caller_table.clone(),
    ));
    let procedures = MetadataCatalog::new(source).load().await;
    if procedures.is_empty() {
        tracing::info!("No stored procedures available, workers not started");
        close_pool(db_pool.close(), config.worker.command_timeout()).await;
        return Ok(());
    }

    let buckets = partition(procedures);
    tracing::info!(
        total = buckets.all().len(),
        user = buckets.bucket(CallerRole::User).len(),
        batch = buckets.bucket(CallerRole::Batch).len(),
        admin = buckets.bucket(CallerRole::Admin).len(),
        "Caller buckets ready"
    );

    let worker_pool = WorkerPool::new(
        Arc::new(buckets),
        WeightedSelector::new(config.selection),
        ParameterSynthesizer::new(&config.synthesis),
        Arc::new(MySqlProcedureExecutor::new(db_pool.clone())),
        WorkerSettings::from(&config.worker),
    );

    let report = worker_pool.run(config.worker.count, cancel).await;
    close_pool(db_pool.close(), config.worker.command_timeout()).await;

    tracing::debug!(metrics = %metrics::render(), "Final metrics");
    tracing::info!(
        executed = report.executed(),
        failed = report.failed(),
        idle = report.idle(),
        "dbhammer stopped"
    );

    Ok(())
}

/// Waits for the pool to close, giving up after `bound`.
async fn close_pool(close: impl std::future::Future<Output = ()>, bound: Duration) {
    if tokio::time::timeout(bound, close).await.is_err() {
        tracing::warn!(
            timeout_secs = bound.as_secs(),
            "Connection pool did not close in time"
        );
    }
}

/// Counts down before the first call. Returns false if cancelled meanwhile.
async fn startup_countdown(seconds: u64, cancel: &CancellationToken) -> bool {
    for remaining in (1..=seconds).rev() {
        tracing::info!(remaining, "Starting workers in {remaining}s");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
        }
    }
    !cancel.is_cancelled()
}

/// Cancels `cancel` on SIGINT or SIGTERM.
async fn shutdown_signal(cancel: CancellationToken) {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), stopping workers");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, stopping workers");
        },
    }

    cancel.cancel();
}
