//! fitscore — multi-agent résumé/job fitness scoring coordinator.
//!
//! Thin CLI wrappers over the same [`Coordinator`] the HTTP handler uses
//! (SPEC_FULL.md §10.6): `serve` runs the scoring endpoint plus the
//! background sweeper, `score` runs one request and prints its JSON response,
//! `migrate` applies the schema and exits.

use clap::{Parser, Subcommand};
use fitscore_core::config::FitscoreConfig;
use fitscore_core::coordinator::Coordinator;
use fitscore_core::error::{FitscoreError, Result};
use fitscore_core::fork::manager::{ForkManager, ForkManagerArgs};
use fitscore_core::fork::provisioning::PrimaryStore;
use fitscore_core::http::{self, AppState};
use fitscore_core::storage::libsql::{ConnectionMode, LibsqlStore};
use fitscore_core::storage::remote::HttpResumeJobStore;
use fitscore_core::storage::ResumeJobStore;
use fitscore_core::types::{JobId, ResumeId};
use fitscore_core::workers::ScoringCatalog;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fitscore")]
#[command(about = "Multi-agent résumé/job fitness scoring coordinator", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to fitscore.toml (optional; falls back to defaults + FITSCORE_* env vars).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP scoring endpoint plus the background fork-ledger sweeper.
    Serve,

    /// Run one scoring request against the configured store and print the JSON response.
    Score {
        #[arg(long)]
        resume: String,
        #[arg(long)]
        job: String,
    },

    /// Apply the libsql schema migrations and exit.
    Migrate,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fitscore=info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn primary_store(config: &FitscoreConfig) -> PrimaryStore {
    match &config.database_token {
        Some(token) if config.database_url.starts_with("http") || config.database_url.starts_with("libsql://") => {
            PrimaryStore::Remote { url: config.database_url.clone(), token: token.clone() }
        }
        _ => PrimaryStore::Local { path: config.database_url.clone(), remote: None },
    }
}

async fn connection_mode(config: &FitscoreConfig) -> ConnectionMode {
    match primary_store(config) {
        PrimaryStore::Remote { url, token } => ConnectionMode::Remote { url, token },
        PrimaryStore::Local { path, .. } => ConnectionMode::Local(path),
        PrimaryStore::InMemory => ConnectionMode::InMemory,
    }
}

async fn build_resume_job_store(config: &FitscoreConfig, db: Arc<LibsqlStore>) -> Result<Arc<dyn ResumeJobStore>> {
    use fitscore_core::config::ResumeJobStoreConfig;
    match &config.resume_job_store {
        ResumeJobStoreConfig::Local => Ok(db),
        ResumeJobStoreConfig::Http { base_url } => Ok(Arc::new(HttpResumeJobStore::new(base_url.clone()))),
    }
}

async fn build_coordinator(config: &FitscoreConfig) -> Result<Coordinator> {
    let mode = connection_mode(config).await;
    let db = Arc::new(LibsqlStore::connect(mode).await?);
    let resume_job_store = build_resume_job_store(config, db.clone()).await?;

    let fork_manager = ForkManager::spawn(ForkManagerArgs {
        store: db.clone(),
        primary: primary_store(config),
        max_active_forks: config.max_active_forks,
        retention_hours: config.fork_retention_hours,
        sweep_interval_secs: config.sweep_interval_secs,
    })
    .await?;

    Ok(Coordinator::new(
        resume_job_store,
        db,
        fork_manager,
        Duration::from_millis(config.worker_timeout_ms),
        ScoringCatalog::default(),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = FitscoreConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Migrate => {
            let mode = connection_mode(&config).await;
            LibsqlStore::connect(mode).await?;
            info!("schema migrations applied");
            Ok(())
        }
        Commands::Score { resume, job } => {
            let coordinator = build_coordinator(&config).await?;
            let response = coordinator.score(ResumeId(resume), JobId(job)).await?;
            println!("{}", serde_json::to_string_pretty(&response).map_err(FitscoreError::from)?);
            Ok(())
        }
        Commands::Serve => {
            let coordinator = Arc::new(build_coordinator(&config).await?);
            let mode = connection_mode(&config).await;
            let result_store = Arc::new(LibsqlStore::connect(mode).await?);

            let app = http::router(AppState { coordinator, result_store });
            let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
            info!(addr = %config.bind_addr, "fitscore listening");
            axum::serve(listener, app).await?;
            Ok(())
        }
    }
}
