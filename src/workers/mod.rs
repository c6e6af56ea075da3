//! Scoring Workers (spec §4.4): five independent implementations of a common
//! capability, `Score(resume_id, job_id, data_url) -> WorkerResult`, registered
//! by [`DimensionKind`] rather than by per-file subclassing (spec §9).

pub mod catalog;
pub mod certification;
pub mod education;
pub mod experience;
pub mod semantic;
pub mod skill;

pub use catalog::ScoringCatalog;

use crate::error::{FitscoreError, Result};
use crate::storage::libsql::{url_to_connection_mode, LibsqlStore};
use crate::storage::ResumeJobStore;
use crate::types::{DimensionKind, Job, JobId, Resume, ResumeId, WorkerResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Extra context a worker may use beyond the raw résumé/job it loads itself.
/// Only the semantic worker currently consumes this (spec §4.4.5 dependency
/// note): the coordinator may supply the skill score if it ran synchronously.
#[derive(Debug, Clone, Default)]
pub struct WorkerContext {
    pub skill_score: Option<f64>,
}

#[async_trait]
pub trait ScoringWorker: Send + Sync {
    fn kind(&self) -> DimensionKind;

    /// Compute this dimension's score. `fork_id` is left empty on the
    /// returned [`WorkerResult`]; the coordinator stamps it in before
    /// persisting, since the worker only ever sees the opaque `data_url`.
    async fn run(
        &self,
        resume_id: &ResumeId,
        job_id: &JobId,
        data_url: &str,
        ctx: &WorkerContext,
    ) -> Result<WorkerResult>;
}

/// Opens the single session a worker is allowed against `data_url`, pings it,
/// and loads résumé and job. The session closes when this returns (spec §4.4
/// common contract: open one session, ping, read, close on all exit paths).
pub(crate) async fn load_pair(resume_id: &ResumeId, job_id: &JobId, data_url: &str) -> Result<(Resume, Job)> {
    let mode = url_to_connection_mode(data_url)?;
    let session = LibsqlStore::connect(mode).await?;
    session.ping().await?;
    let resume = session
        .get_resume(resume_id)
        .await?
        .ok_or_else(|| FitscoreError::NotFound(format!("resume:{resume_id}")))?;
    let job = session
        .get_job(job_id)
        .await?
        .ok_or_else(|| FitscoreError::NotFound(format!("job:{job_id}")))?;
    Ok((resume, job))
}

/// Every worker validates its own score before returning (spec §4.4, §9).
pub(crate) fn validate_score(score: f64) -> Result<f64> {
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return Err(FitscoreError::WorkerInvalidResult(format!(
            "score {score} is not finite and in [0, 100]"
        )));
    }
    Ok(score)
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// The fixed registry mapping each [`DimensionKind`] to its implementation
/// (spec §9: "a registry... replaces per-file subclasses"). `Arc` so each
/// worker can be cloned into its own concurrent task by the coordinator.
pub fn registry(catalog: ScoringCatalog) -> Vec<Arc<dyn ScoringWorker>> {
    vec![
        Arc::new(skill::SkillWorker::new(catalog.clone())),
        Arc::new(semantic::SemanticWorker::new(catalog.clone())),
        Arc::new(experience::ExperienceWorker::new()),
        Arc::new(education::EducationWorker::new(catalog.clone())),
        Arc::new(certification::CertificationWorker::new(catalog)),
    ]
}
