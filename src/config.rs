//! Runtime configuration, layered with the `config` crate: built-in defaults,
//! an optional `fitscore.toml`, then `FITSCORE_*` environment variables.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Where the Coordinator reads résumés and jobs from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResumeJobStoreConfig {
    /// The embedded libsql database also used for the fork ledger.
    Local,
    /// An external résumé/job service reachable over HTTP.
    Http { base_url: String },
}

impl Default for ResumeJobStoreConfig {
    fn default() -> Self {
        ResumeJobStoreConfig::Local
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitscoreConfig {
    /// Path or URL for the primary libsql store (fork ledger, worker results,
    /// composite scores, and — in `Local` mode — résumés/jobs).
    pub database_url: String,

    /// Auth token, required only for a remote/embedded-replica database_url.
    pub database_token: Option<String>,

    pub bind_addr: String,

    /// Active-fork concurrency cap (spec §4.1).
    pub max_active_forks: usize,

    /// Per-worker completion deadline (spec §4.3 step 5).
    pub worker_timeout_ms: u64,

    /// Terminal forks older than this are sweep-eligible (spec §3).
    pub fork_retention_hours: i64,

    /// Sweeper cadence (spec §4.1, §5).
    pub sweep_interval_secs: u64,

    pub resume_job_store: ResumeJobStoreConfig,
}

impl Default for FitscoreConfig {
    fn default() -> Self {
        Self {
            database_url: "fitscore.db".to_string(),
            database_token: None,
            bind_addr: "127.0.0.1:8080".to_string(),
            max_active_forks: 10,
            worker_timeout_ms: 120_000,
            fork_retention_hours: 24,
            sweep_interval_secs: 1800,
            resume_job_store: ResumeJobStoreConfig::default(),
        }
    }
}

impl FitscoreConfig {
    /// Load defaults, then an optional `fitscore.toml` at `path`, then
    /// `FITSCORE_*` environment variables (highest precedence).
    pub fn load(path: Option<&str>) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("database_url", defaults.database_url.clone())?
            .set_default("bind_addr", defaults.bind_addr.clone())?
            .set_default("max_active_forks", defaults.max_active_forks as i64)?
            .set_default("worker_timeout_ms", defaults.worker_timeout_ms as i64)?
            .set_default("fork_retention_hours", defaults.fork_retention_hours)?
            .set_default("sweep_interval_secs", defaults.sweep_interval_secs as i64)?
            .set_default("resume_job_store.kind", "local")?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("FITSCORE")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build()?;
        Ok(settings.try_deserialize()?)
    }
}
