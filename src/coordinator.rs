//! The Coordinator (spec §4.3): turns one scoring request into five
//! independent worker executions, fuses them under the selected weight
//! profile, and persists the result.

use crate::error::{FitscoreError, Result};
use crate::fork::ForkManagerHandle;
use crate::storage::{ResultStore, ResumeJobStore};
use crate::types::{CompositeScore, DimensionKind, Fork, ForkState, JobId, ResumeId, WorkerResult};
use crate::weights::{self, Weights};
use crate::workers::{self, ScoringCatalog, ScoringWorker, WorkerContext};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub struct Coordinator {
    resume_job_store: Arc<dyn ResumeJobStore>,
    result_store: Arc<dyn ResultStore>,
    fork_manager: ForkManagerHandle,
    worker_timeout: Duration,
    catalog: ScoringCatalog,
}

#[derive(Debug, Clone, Serialize)]
pub struct Scores {
    pub skill: f64,
    pub semantic: f64,
    pub experience: f64,
    pub education: f64,
    pub certification: f64,
    pub composite: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseWeights {
    pub skill: f64,
    pub semantic: f64,
    pub experience: f64,
    pub education: f64,
    pub certification: f64,
    pub profile_tag: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakdownEntry {
    pub score: f64,
    pub weight: f64,
    pub status: String,
    pub detail: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreResponse {
    pub resume_id: String,
    pub job_id: String,
    pub scores: Scores,
    pub weights: ResponseWeights,
    pub breakdown: HashMap<String, BreakdownEntry>,
    pub agents_completed: u8,
    pub processing_time_ms: u64,
}

/// One worker's terminal outcome, folded together regardless of whether it
/// completed or failed (spec §7: worker failures never surface as `Err`).
enum Outcome {
    Completed(WorkerResult),
    Failed { kind: DimensionKind, error: String },
}

impl Outcome {
    fn kind(&self) -> DimensionKind {
        match self {
            Outcome::Completed(r) => r.kind,
            Outcome::Failed { kind, .. } => *kind,
        }
    }

    fn score(&self) -> f64 {
        match self {
            Outcome::Completed(r) => r.score,
            Outcome::Failed { .. } => 0.0,
        }
    }
}

impl Coordinator {
    pub fn new(
        resume_job_store: Arc<dyn ResumeJobStore>,
        result_store: Arc<dyn ResultStore>,
        fork_manager: ForkManagerHandle,
        worker_timeout: Duration,
        catalog: ScoringCatalog,
    ) -> Self {
        Self { resume_job_store, result_store, fork_manager, worker_timeout, catalog }
    }

    #[tracing::instrument(skip(self), fields(%resume_id, %job_id))]
    pub async fn score(&self, resume_id: ResumeId, job_id: JobId) -> Result<ScoreResponse> {
        let request_start = Instant::now();
        info!("scoring request received");

        let resume = self
            .resume_job_store
            .get_resume(&resume_id)
            .await?
            .ok_or_else(|| FitscoreError::NotFound(format!("resume:{resume_id}")))?;
        let job = self
            .resume_job_store
            .get_job(&job_id)
            .await?
            .ok_or_else(|| FitscoreError::NotFound(format!("job:{job_id}")))?;
        drop(resume); // the coordinator only needed these to fail fast; workers re-read via their own session

        let (profile_tag, weights) = weights::select(&job.title, &job.description);

        let forks = self.acquire_all_forks(&resume_id, &job_id).await?;
        let outcomes = self.run_all_workers(&resume_id, &job_id, &forks).await;
        self.release_and_persist(&forks, &outcomes).await;

        let composite = build_composite(&resume_id, &job_id, &outcomes, &weights, profile_tag.as_str(), request_start);
        if let Err(e) = self.result_store.upsert_composite(&composite).await {
            // Retried once per spec §7 PersistenceFailure; response still returned from in-memory values.
            warn!(error = %e, "composite upsert failed, retrying once");
            if let Err(e2) = self.result_store.upsert_composite(&composite).await {
                warn!(error = %e2, "composite upsert retry also failed; returning in-memory result anyway");
            }
        }

        let response = build_response(&resume_id, &job_id, &outcomes, &weights, &composite, request_start);
        info!(composite = composite.composite, agents_completed = composite.agents_completed, "scoring request complete");
        Ok(response)
    }

    async fn acquire_all_forks(&self, resume_id: &ResumeId, job_id: &JobId) -> Result<HashMap<DimensionKind, Fork>> {
        let mut forks = HashMap::new();
        for kind in DimensionKind::ALL {
            match self.fork_manager.acquire(kind, resume_id.clone(), job_id.clone()).await {
                Ok(fork) => {
                    forks.insert(kind, fork);
                }
                Err(e) => {
                    warn!(error = %e, kind = %kind, "fork acquisition failed, releasing partial forks");
                    for fork in forks.into_values() {
                        let _ = self
                            .fork_manager
                            .release(fork.fork_id, ForkState::Failed, Some("sibling acquisition failed".into()))
                            .await;
                    }
                    return Err(e);
                }
            }
        }
        Ok(forks)
    }

    /// Runs skill synchronously first (when it completes quickly), then the
    /// remaining four concurrently, feeding the skill score into the semantic
    /// worker (spec §4.4.5 dependency note; decision recorded in SPEC_FULL.md §11).
    async fn run_all_workers(&self, resume_id: &ResumeId, job_id: &JobId, forks: &HashMap<DimensionKind, Fork>) -> Vec<Outcome> {
        let registry = workers::registry(self.catalog.clone());
        let by_kind: HashMap<DimensionKind, Arc<dyn ScoringWorker>> =
            registry.into_iter().map(|w| (w.kind(), w)).collect();

        let skill_fork = forks[&DimensionKind::Skill].clone();
        let skill_worker = by_kind[&DimensionKind::Skill].clone();
        let skill_outcome = run_one(skill_worker, resume_id.clone(), job_id.clone(), skill_fork, WorkerContext::default(), self.worker_timeout).await;

        let skill_score = match &skill_outcome {
            Outcome::Completed(r) => Some(r.score),
            Outcome::Failed { .. } => None,
        };
        let semantic_ctx = WorkerContext { skill_score };

        let mut handles = Vec::new();
        for kind in [DimensionKind::Semantic, DimensionKind::Experience, DimensionKind::Education, DimensionKind::Certification] {
            let worker = by_kind[&kind].clone();
            let fork = forks[&kind].clone();
            let ctx = if kind == DimensionKind::Semantic { semantic_ctx.clone() } else { WorkerContext::default() };
            let resume_id = resume_id.clone();
            let job_id = job_id.clone();
            let timeout = self.worker_timeout;
            handles.push(tokio::spawn(async move { run_one(worker, resume_id, job_id, fork, ctx, timeout).await }));
        }

        let mut outcomes = vec![skill_outcome];
        for handle in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => outcomes.push(Outcome::Failed { kind: DimensionKind::Semantic, error: format!("worker task panicked: {e}") }),
            }
        }
        outcomes
    }

    async fn release_and_persist(&self, forks: &HashMap<DimensionKind, Fork>, outcomes: &[Outcome]) {
        for outcome in outcomes {
            let fork = &forks[&outcome.kind()];
            match outcome {
                Outcome::Completed(result) => {
                    let mut stamped = result.clone();
                    stamped.fork_id = fork.fork_id.clone();
                    if let Err(e) = self.result_store.write_worker_result(result.kind, &stamped).await {
                        warn!(error = %e, kind = %result.kind, "failed to persist worker result");
                    }
                    let _ = self.fork_manager.release(fork.fork_id.clone(), ForkState::Completed, None).await;
                }
                Outcome::Failed { error, .. } => {
                    let _ = self.fork_manager.release(fork.fork_id.clone(), ForkState::Failed, Some(error.clone())).await;
                }
            }
        }
    }
}

async fn run_one(
    worker: Arc<dyn ScoringWorker>,
    resume_id: ResumeId,
    job_id: JobId,
    fork: Fork,
    ctx: WorkerContext,
    deadline: Duration,
) -> Outcome {
    match tokio::time::timeout(deadline, worker.run(&resume_id, &job_id, &fork.data_url, &ctx)).await {
        Ok(Ok(mut result)) => {
            result.fork_id = fork.fork_id.clone();
            Outcome::Completed(result)
        }
        Ok(Err(e)) => Outcome::Failed { kind: worker.kind(), error: e.to_string() },
        Err(_elapsed) => Outcome::Failed { kind: worker.kind(), error: format!("worker timed out after {}ms", deadline.as_millis()) },
    }
}

fn weight_for(weights: &Weights, kind: DimensionKind) -> f64 {
    match kind {
        DimensionKind::Skill => weights.skill,
        DimensionKind::Semantic => weights.semantic,
        DimensionKind::Experience => weights.experience,
        DimensionKind::Education => weights.education,
        DimensionKind::Certification => weights.certification,
    }
}

fn build_composite(
    resume_id: &ResumeId,
    job_id: &JobId,
    outcomes: &[Outcome],
    weights: &Weights,
    profile_tag: &str,
    request_start: Instant,
) -> CompositeScore {
    let score_of = |kind: DimensionKind| outcomes.iter().find(|o| o.kind() == kind).map(|o| o.score()).unwrap_or(0.0);
    let agents_completed = outcomes.iter().filter(|o| matches!(o, Outcome::Completed(_))).count() as u8;

    let raw_composite: f64 = DimensionKind::ALL.iter().map(|&kind| score_of(kind) * weight_for(weights, kind)).sum();

    CompositeScore {
        resume_id: resume_id.clone(),
        job_id: job_id.clone(),
        skill: score_of(DimensionKind::Skill),
        semantic: score_of(DimensionKind::Semantic),
        experience: score_of(DimensionKind::Experience),
        education: score_of(DimensionKind::Education),
        certification: score_of(DimensionKind::Certification),
        composite: (raw_composite * 100.0).round() / 100.0,
        agents_completed,
        total_processing_time_ms: request_start.elapsed().as_millis() as u64,
        profile_tag: profile_tag.to_string(),
        created_at: chrono::Utc::now(),
    }
}

fn build_response(
    resume_id: &ResumeId,
    job_id: &JobId,
    outcomes: &[Outcome],
    weights: &Weights,
    composite: &CompositeScore,
    request_start: Instant,
) -> ScoreResponse {
    let mut breakdown = HashMap::new();
    for outcome in outcomes {
        let kind = outcome.kind();
        let (status, score, detail) = match outcome {
            Outcome::Completed(r) => ("completed".to_string(), r.score, r.detail.clone()),
            Outcome::Failed { error, .. } => ("failed".to_string(), 0.0, serde_json::json!({ "error": error })),
        };
        breakdown.insert(
            kind.to_string(),
            BreakdownEntry { score: to_unit(score), weight: weight_for(weights, kind), status, detail },
        );
    }

    ScoreResponse {
        resume_id: resume_id.to_string(),
        job_id: job_id.to_string(),
        scores: Scores {
            skill: to_unit(composite.skill),
            semantic: to_unit(composite.semantic),
            experience: to_unit(composite.experience),
            education: to_unit(composite.education),
            certification: to_unit(composite.certification),
            composite: to_unit(composite.composite),
        },
        weights: ResponseWeights {
            skill: weights.skill,
            semantic: weights.semantic,
            experience: weights.experience,
            education: weights.education,
            certification: weights.certification,
            profile_tag: composite.profile_tag.clone(),
        },
        breakdown,
        agents_completed: composite.agents_completed,
        processing_time_ms: request_start.elapsed().as_millis() as u64,
    }
}

/// Rescale an internal 0-100 score to the [0,1] API boundary (spec §9: avoid
/// the double-rescaling bug by doing this exactly once, here). The 0-100
/// value is already rounded to two decimals upstream (`build_composite`);
/// this only clamps and divides, it must not round again.
fn to_unit(score: f64) -> f64 {
    (score / 100.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResumeId as RId;

    fn completed(kind: DimensionKind, score: f64) -> Outcome {
        Outcome::Completed(WorkerResult { fork_id: "f".into(), kind, score, processing_time_ms: 5, detail: serde_json::json!({}) })
    }

    #[test]
    fn composite_matches_perfect_senior_scenario() {
        let outcomes = vec![
            completed(DimensionKind::Skill, 100.0),
            completed(DimensionKind::Semantic, 100.0),
            completed(DimensionKind::Experience, 100.0),
            completed(DimensionKind::Education, 100.0),
            completed(DimensionKind::Certification, 50.0),
        ];
        let (_, weights) = weights::select("Senior Python Developer", "Python, Django, 5+ years");
        let composite = build_composite(&RId("r1".into()), &JobId("j1".into()), &outcomes, &weights, "Senior/Leadership", Instant::now());
        assert!((composite.composite - 97.5).abs() < 0.01, "composite was {}", composite.composite);
        assert_eq!(composite.agents_completed, 5);
    }

    #[test]
    fn degraded_run_drops_failed_dimension_from_agents_completed() {
        let outcomes = vec![
            completed(DimensionKind::Skill, 80.0),
            completed(DimensionKind::Semantic, 80.0),
            Outcome::Failed { kind: DimensionKind::Experience, error: "timeout".into() },
            completed(DimensionKind::Education, 100.0),
            completed(DimensionKind::Certification, 50.0),
        ];
        let (_, weights) = weights::select("Office Manager", "General admin work");
        let composite = build_composite(&RId("r1".into()), &JobId("j1".into()), &outcomes, &weights, "Default", Instant::now());
        assert_eq!(composite.agents_completed, 4);
        assert_eq!(composite.experience, 0.0);
    }

    #[test]
    fn response_scores_are_rescaled_to_unit_interval() {
        assert_eq!(to_unit(100.0), 1.0);
        assert_eq!(to_unit(0.0), 0.0);
        assert_eq!(to_unit(50.0), 0.5);
    }
}
