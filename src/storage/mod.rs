//! Storage layer: the external résumé/job collaborator and the Result Store.
//!
//! Two independent traits, matching spec §6's split between the (read-only,
//! externally owned) résumé/job collaborator and the (core-owned) persistence
//! of fork lifecycle, worker results, and composite scores.

pub mod libsql;
pub mod remote;

use crate::error::Result;
use crate::types::{CompositeScore, DimensionKind, Fork, ForkState, Job, JobId, Resume, ResumeId, WorkerResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// The external résumé/job store (spec §6 "External collaborators").
///
/// Implementations may hit the embedded libsql database (`Local`) or an
/// external HTTP service (`Http`), per [`crate::config::ResumeJobStoreConfig`].
#[async_trait]
pub trait ResumeJobStore: Send + Sync {
    async fn get_resume(&self, id: &ResumeId) -> Result<Option<Resume>>;
    async fn get_job(&self, id: &JobId) -> Result<Option<Job>>;
}

/// The Result Store (spec §4.1, §6 "Persisted state layout"): fork ledger,
/// append-only worker results, and upserted composite scores.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Insert a new ledger row in `Pending` state.
    async fn create_fork(&self, fork: &Fork) -> Result<()>;

    /// Transition a ledger row's state. `data_url` is stamped only on the
    /// `Pending -> Active` transition. Idempotent on repeated terminal calls.
    async fn transition_fork(
        &self,
        fork_id: &str,
        state: ForkState,
        data_url: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<()>;

    async fn get_fork(&self, fork_id: &str) -> Result<Option<Fork>>;

    /// Forks in a terminal state, for introspection and for the sweeper.
    async fn list_forks_by_state(&self, state: ForkState) -> Result<Vec<Fork>>;

    /// Delete terminal forks created before `older_than`. Returns the count deleted.
    async fn sweep_forks(&self, older_than: DateTime<Utc>) -> Result<u64>;

    /// Append one worker result row, keyed by `fork_id` (spec §5: append-only log).
    async fn write_worker_result(&self, kind: DimensionKind, result: &WorkerResult) -> Result<()>;

    /// Upsert the composite row keyed by `(resume_id, job_id)` (spec §5, §9).
    async fn upsert_composite(&self, composite: &CompositeScore) -> Result<()>;

    async fn get_composite(&self, resume_id: &ResumeId, job_id: &JobId) -> Result<Option<CompositeScore>>;
}
