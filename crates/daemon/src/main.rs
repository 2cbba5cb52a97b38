//! LexCompare Daemon - Main Entry Point
//!
//! Composition root: configuration, logging, DI wiring, crash recovery,
//! JSON-RPC server and graceful shutdown.

mod config;
mod telemetry;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Import workspace crates
use lexcompare_api_rpc::{RateLimiter, RpcHandler, RpcServer, RpcServerConfig};
use lexcompare_core::application::constants::SHUTDOWN_DRAIN_TIMEOUT;
use lexcompare_core::application::{
    JobOrchestrator, JobRunner, RecoveryService, RetryableCallExecutor, StatusService,
    SubmissionService,
};
use lexcompare_core::port::id_provider::UuidProvider;
use lexcompare_core::port::sleeper::TokioSleeper;
use lexcompare_core::port::time_provider::SystemTimeProvider;
use lexcompare_core::port::{
    DocumentStore, GenerationService, JobRepository, ResultStore, TimeProvider,
};
use lexcompare_infra_fs::{FsDocumentStore, FsResultStore};
use lexcompare_infra_gemini::GeminiGenerationService;
use lexcompare_infra_sqlite::{create_pool, run_migrations, SqliteJobRepository};

use crate::config::{DaemonConfig, LogFormat};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const LOG_FILE_NAME: &str = "lexcompare.log";

/// Install the global subscriber. The returned guard flushes the file writer on drop.
fn init_logging(config: &DaemonConfig) -> Result<Option<WorkerGuard>> {
    let (telemetry_layer, telemetry_note) = telemetry::layer()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("lexcompare=info"))
        .context("Failed to create env filter")?;

    let (file_writer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(telemetry_layer)
        .with(env_filter)
        // Production: JSON structured logging
        .with(json.then(|| fmt::layer().json()))
        // Development: pretty formatting with colors
        .with((!json).then(|| fmt::layer().pretty()))
        .with(file_writer.map(|writer| fmt::layer().json().with_writer(writer)))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(note) = telemetry_note {
        info!("{}", note);
    }

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = DaemonConfig::from_env().context("Invalid configuration")?;

    // 2. Initialize logging (and optional telemetry)
    let _log_guard = init_logging(&config)?;

    info!("LexCompare daemon v{} starting...", VERSION);
    info!(
        data_dir = %config.data_dir.display(),
        demo_dir = %config.demo_dir.display(),
        model = %config.gemini.model,
        "Configuration loaded"
    );

    // 3. Initialize database
    if let Some(parent) = std::path::Path::new(&config.db_path).parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    info!(db_path = %config.db_path, "Initializing database...");
    let pool = create_pool(&config.db_path)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 4. Data directory (staged documents, artifacts, reports)
    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;

    // 5. Setup dependencies (DI wiring)
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let job_repo: Arc<dyn JobRepository> = Arc::new(SqliteJobRepository::new(pool.clone()));
    let results: Arc<dyn ResultStore> = Arc::new(FsResultStore::new(&config.data_dir));
    let documents: Arc<dyn DocumentStore> = Arc::new(FsDocumentStore::new(&config.data_dir));
    let generation: Arc<dyn GenerationService> = Arc::new(
        GeminiGenerationService::new(config.gemini.clone())
            .map_err(|e| anyhow::anyhow!("Generation client setup failed: {}", e))?,
    );
    let executor = Arc::new(RetryableCallExecutor::new(
        config.retry.clone(),
        Arc::new(TokioSleeper),
    ));

    let orchestrator = Arc::new(JobOrchestrator::new(
        generation,
        documents.clone(),
        results.clone(),
        job_repo.clone(),
        time_provider.clone(),
        executor,
    ));
    let runner = Arc::new(JobRunner::new(orchestrator));

    let submission = Arc::new(
        SubmissionService::new(
            documents.clone(),
            job_repo.clone(),
            Arc::new(UuidProvider),
            time_provider.clone(),
            runner.clone(),
        )
        .with_demo_dir(&config.demo_dir),
    );
    let status = Arc::new(StatusService::new(
        results.clone(),
        job_repo.clone(),
        documents,
    ));

    // 6. Run crash recovery
    info!("Running crash recovery...");
    let recovery_service = RecoveryService::new(job_repo.clone(), results, time_provider);
    match recovery_service.recover_interrupted_jobs().await {
        Ok(count) => info!(recovered_jobs = count, "Crash recovery completed"),
        Err(e) => tracing::error!(error = ?e, "Crash recovery failed"),
    }

    // 7. Start JSON-RPC server
    info!("Starting JSON-RPC server...");
    let handler = RpcHandler::new(
        submission,
        status,
        job_repo,
        runner.clone(),
        RateLimiter::new(config.rate_limit_burst, config.rate_limit_rate),
    );
    let rpc_config = RpcServerConfig {
        port: config.rpc_port,
        ..Default::default()
    };
    let (addr, rpc_handle) = RpcServer::new(rpc_config, handler)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(addr = %addr, "System ready. Press Ctrl+C to shutdown");

    // 8. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 9. Graceful shutdown: stop accepting calls, then give running jobs a moment
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;

    if !runner.drain(SHUTDOWN_DRAIN_TIMEOUT).await {
        warn!(
            running_jobs = runner.running(),
            "Jobs still running at shutdown; they will be recovered on next start"
        );
    }

    telemetry::shutdown();
    info!("Shutdown complete.");

    Ok(())
}
