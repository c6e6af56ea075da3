//! Education dimension (spec §4.4.3): degree tier comparison.

use super::{elapsed_ms, load_pair, validate_score, ScoringCatalog, ScoringWorker, WorkerContext};
use crate::error::Result;
use crate::types::{DimensionKind, JobId, ResumeId, WorkerResult};
use async_trait::async_trait;
use serde_json::json;
use std::time::Instant;

pub struct EducationWorker {
    catalog: ScoringCatalog,
}

impl EducationWorker {
    pub fn new(catalog: ScoringCatalog) -> Self {
        Self { catalog }
    }
}

/// Highest tier whose keyword appears in `text`; `(0, "none")` if none match.
fn highest_tier<'a>(text: &str, catalog: &'a ScoringCatalog) -> (u8, &'a str) {
    let lower = text.to_lowercase();
    catalog
        .degree_tiers
        .iter()
        .filter(|(keyword, _)| lower.contains(keyword))
        .max_by_key(|(_, tier)| *tier)
        .map(|(keyword, tier)| (*tier, *keyword))
        .unwrap_or((0, "none"))
}

pub(crate) fn compute(t_c: u8, t_r: u8) -> f64 {
    if t_r == 0 || t_c >= t_r {
        100.0
    } else if t_c == 0 {
        0.0
    } else {
        100.0 * t_c as f64 / t_r as f64
    }
}

#[async_trait]
impl ScoringWorker for EducationWorker {
    fn kind(&self) -> DimensionKind {
        DimensionKind::Education
    }

    async fn run(
        &self,
        resume_id: &ResumeId,
        job_id: &JobId,
        data_url: &str,
        _ctx: &WorkerContext,
    ) -> Result<WorkerResult> {
        let start = Instant::now();
        let (resume, job) = load_pair(resume_id, job_id, data_url).await?;

        let resume_text = resume.education.join(" ");
        let (t_c, label_c) = highest_tier(&resume_text, &self.catalog);
        let (t_r, label_r) = highest_tier(&job.description, &self.catalog);
        let score = compute(t_c, t_r);

        let detail = json!({
            "candidate_tier": label_c,
            "required_tier": label_r,
            "requirement_met": t_r == 0 || t_c >= t_r,
        });

        Ok(WorkerResult {
            fork_id: String::new(),
            kind: DimensionKind::Education,
            score: validate_score(score)?,
            processing_time_ms: elapsed_ms(start),
            detail,
        })
    }
}
