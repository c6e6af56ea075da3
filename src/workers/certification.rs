//! Certification dimension (spec §4.4.4).

use super::{elapsed_ms, load_pair, validate_score, ScoringCatalog, ScoringWorker, WorkerContext};
use crate::error::Result;
use crate::types::{DimensionKind, JobId, ResumeId, WorkerResult};
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeSet;
use std::time::Instant;

pub struct CertificationWorker {
    catalog: ScoringCatalog,
}

impl CertificationWorker {
    pub fn new(catalog: ScoringCatalog) -> Self {
        Self { catalog }
    }

    fn extract(&self, text: &str) -> BTreeSet<String> {
        let lower = text.to_lowercase();
        self.catalog.certifications.iter().filter(|c| lower.contains(c.as_str())).cloned().collect()
    }
}

pub(crate) fn compute(c_job: &BTreeSet<String>, c_res: &BTreeSet<String>) -> f64 {
    if c_job.is_empty() {
        return if !c_res.is_empty() { 50.0 } else { 30.0 };
    }
    if c_res.is_empty() {
        return 0.0;
    }
    100.0 * c_job.intersection(c_res).count() as f64 / c_job.len() as f64
}

#[async_trait]
impl ScoringWorker for CertificationWorker {
    fn kind(&self) -> DimensionKind {
        DimensionKind::Certification
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

        let c_job = self.extract(&job.description);
        let resume_text = resume.certifications.join(" ");
        let c_res: BTreeSet<String> = resume
            .certifications
            .iter()
            .map(|c| c.to_lowercase())
            .chain(self.extract(&resume_text))
            .collect();

        let score = compute(&c_job, &c_res);

        let detail = json!({
            "matched": c_job.intersection(&c_res).cloned().collect::<Vec<_>>(),
            "missing": c_job.difference(&c_res).cloned().collect::<Vec<_>>(),
        });

        Ok(WorkerResult {
            fork_id: String::new(),
            kind: DimensionKind::Certification,
            score: validate_score(score)?,
            processing_time_ms: elapsed_ms(start),
            detail,
        })
    }
}
