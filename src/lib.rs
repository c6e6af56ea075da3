//! fitscore — multi-agent résumé/job fitness scoring coordinator.
//!
//! A single (résumé, job) scoring request fans out to five independent
//! scoring workers (skill, semantic, experience, education, certification),
//! each reading through its own isolated [`fork`] data context, and fuses
//! their outputs under a job-type-sensitive [`weights`] profile.
//!
//! # Architecture
//!
//! - **[`types`]**: core entities (`Resume`, `Job`, `Fork`, `WorkerResult`, `CompositeScore`).
//! - **[`fork`]**: the Fork/Context Manager — provisions per-worker data contexts.
//! - **[`weights`]**: the pure Weight Profile Selector.
//! - **[`workers`]**: the five scoring workers and their shared contract.
//! - **[`coordinator`]**: schedules workers, aggregates, persists.
//! - **[`storage`]**: the Result Store and the local résumé/job store.
//! - **[`http`]**: the scoring endpoint and operational surface.
//!
//! # Example
//!
//! ```ignore
//! use fitscore_core::{config::FitscoreConfig, coordinator::Coordinator};
//!
//! #[tokio::main]
//! async fn main() -> fitscore_core::error::Result<()> {
//!     let config = FitscoreConfig::load(Some("fitscore.toml"))?;
//!     // ... construct storage, fork manager, and coordinator, then:
//!     // let response = coordinator.score(resume_id, job_id).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod coordinator;
pub mod embeddings;
pub mod error;
pub mod fork;
pub mod http;
pub mod storage;
pub mod types;
pub mod utils;
pub mod weights;
pub mod workers;

pub use config::FitscoreConfig;
pub use coordinator::{Coordinator, ScoreResponse};
pub use error::{FitscoreError, Result};
pub use types::{CompositeScore, DimensionKind, Fork, ForkState, Job, JobId, Resume, ResumeId, WorkerResult};
pub use weights::{ProfileTag, Weights};
