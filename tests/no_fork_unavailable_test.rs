//! Exercises the coordinator's `NoFork`/Unavailable path (spec §7) by wrapping
//! a real Result Store with one whose fork creation always fails, since the
//! real provisioning strategies are not practical to fault-inject directly.

mod common;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fitscore_core::coordinator::Coordinator;
use fitscore_core::error::{FitscoreError, Result};
use fitscore_core::fork::manager::{ForkManager, ForkManagerArgs};
use fitscore_core::fork::provisioning::PrimaryStore;
use fitscore_core::storage::ResultStore;
use fitscore_core::types::{CompositeScore, DimensionKind, Fork, ForkState, Job, JobId, Resume, ResumeId, WorkerResult};
use fitscore_core::workers::ScoringCatalog;
use std::sync::Arc;
use std::time::Duration;

/// A `ResultStore` that always refuses to create a fork, as though every
/// provisioning strategy (zero-copy fork, physical clone, logical context)
/// had exhausted itself.
struct AlwaysFullStore {
    inner: Arc<fitscore_core::storage::libsql::LibsqlStore>,
}

#[async_trait]
impl ResultStore for AlwaysFullStore {
    async fn create_fork(&self, _fork: &Fork) -> Result<()> {
        Err(FitscoreError::NoFork("simulated exhaustion of all provisioning strategies".into()))
    }

    async fn transition_fork(&self, fork_id: &str, state: ForkState, data_url: Option<&str>, error_message: Option<&str>) -> Result<()> {
        self.inner.transition_fork(fork_id, state, data_url, error_message).await
    }

    async fn get_fork(&self, fork_id: &str) -> Result<Option<Fork>> {
        self.inner.get_fork(fork_id).await
    }

    async fn list_forks_by_state(&self, state: ForkState) -> Result<Vec<Fork>> {
        self.inner.list_forks_by_state(state).await
    }

    async fn sweep_forks(&self, older_than: DateTime<Utc>) -> Result<u64> {
        self.inner.sweep_forks(older_than).await
    }

    async fn write_worker_result(&self, kind: DimensionKind, result: &WorkerResult) -> Result<()> {
        self.inner.write_worker_result(kind, result).await
    }

    async fn upsert_composite(&self, composite: &CompositeScore) -> Result<()> {
        self.inner.upsert_composite(composite).await
    }

    async fn get_composite(&self, resume_id: &ResumeId, job_id: &JobId) -> Result<Option<CompositeScore>> {
        self.inner.get_composite(resume_id, job_id).await
    }
}

#[async_trait]
impl fitscore_core::storage::ResumeJobStore for AlwaysFullStore {
    async fn get_resume(&self, id: &ResumeId) -> Result<Option<Resume>> {
        self.inner.get_resume(id).await
    }
    async fn get_job(&self, id: &JobId) -> Result<Option<Job>> {
        self.inner.get_job(id).await
    }
}

#[tokio::test]
async fn exhausted_fork_provisioning_surfaces_as_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no_fork.db").to_string_lossy().to_string();
    let inner = Arc::new(
        fitscore_core::storage::libsql::LibsqlStore::connect(fitscore_core::storage::libsql::ConnectionMode::Local(path.clone()))
            .await
            .unwrap(),
    );

    let resume = common::senior_python_resume("r-full", 6, common::unit_embedding(1.0, 7));
    let job = common::senior_python_job("j-full", 5, common::unit_embedding(1.0, 7));
    inner.put_resume(&resume).await.unwrap();
    inner.put_job(&job).await.unwrap();

    let store: Arc<AlwaysFullStore> = Arc::new(AlwaysFullStore { inner: inner.clone() });

    let fork_manager = ForkManager::spawn(ForkManagerArgs {
        store: store.clone(),
        primary: PrimaryStore::Local { path, remote: None },
        max_active_forks: 10,
        retention_hours: 24,
        sweep_interval_secs: 3600,
    })
    .await
    .unwrap();

    let coordinator = Coordinator::new(
        store.clone(),
        store.clone(),
        fork_manager,
        Duration::from_secs(5),
        ScoringCatalog::default(),
    );

    let err = coordinator.score(ResumeId("r-full".into()), JobId("j-full".into())).await.unwrap_err();
    assert!(matches!(err, FitscoreError::NoFork(_)), "expected NoFork, got {err:?}");
}
