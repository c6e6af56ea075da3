//! Shared test fixtures for integration tests.
//!
//! Mirrors the teacher's own test helper pattern: use a temp *file*-backed
//! libsql database rather than `:memory:`, since each `:memory:` connection
//! is isolated and physical-clone/logical-context forks would otherwise see
//! an empty database.

use fitscore_core::fork::manager::{ForkManager, ForkManagerArgs, ForkManagerHandle};
use fitscore_core::fork::provisioning::PrimaryStore;
use fitscore_core::storage::libsql::{ConnectionMode, LibsqlStore};
use fitscore_core::types::{Job, JobId, Resume, ResumeId};
use std::sync::Arc;

pub struct Fixture {
    pub store: Arc<LibsqlStore>,
    pub fork_manager: ForkManagerHandle,
    pub _dir: tempfile::TempDir,
}

pub async fn seeded_fixture(max_active_forks: usize) -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("fitscore_test.db").to_string_lossy().to_string();

    let store = Arc::new(LibsqlStore::connect(ConnectionMode::Local(path.clone())).await.expect("connect"));

    let fork_manager = ForkManager::spawn(ForkManagerArgs {
        store: store.clone(),
        primary: PrimaryStore::Local { path, remote: None },
        max_active_forks,
        retention_hours: 24,
        sweep_interval_secs: 3600,
    })
    .await
    .expect("spawn fork manager");

    Fixture { store, fork_manager, _dir: dir }
}

pub fn unit_embedding(first: f32, rest_len: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; rest_len + 1];
    v[0] = first;
    let leftover = (1.0 - first * first).max(0.0).sqrt();
    if rest_len > 0 {
        v[1] = leftover;
    }
    v
}

pub fn senior_python_resume(id: &str, years: u32, embedding: Vec<f32>) -> Resume {
    Resume {
        resume_id: ResumeId(id.to_string()),
        body: "Experienced Python and Django engineer, 6 years building web platforms.".into(),
        skills: vec!["python".into(), "django".into()],
        years_experience: years,
        education: vec!["BS Computer Science".into()],
        certifications: vec![],
        embedding,
    }
}

pub fn senior_python_job(id: &str, required_years: u32, embedding: Vec<f32>) -> Job {
    Job {
        job_id: JobId(id.to_string()),
        title: "Senior Python Developer".into(),
        description: "Python, Django, 5+ years of experience required.".into(),
        required_years,
        embedding,
    }
}
