//! Semantic dimension (spec §4.4.5): embedding cosine similarity blended with
//! a domain-relevance estimate and a skill/semantic alignment adjustment.

use super::{elapsed_ms, load_pair, validate_score, ScoringCatalog, ScoringWorker, WorkerContext};
use crate::embeddings::cosine_similarity;
use crate::error::Result;
use crate::types::{DimensionKind, Job, JobId, Resume, ResumeId, WorkerResult};
use async_trait::async_trait;
use serde_json::json;
use std::time::Instant;

pub struct SemanticWorker {
    catalog: ScoringCatalog,
}

impl SemanticWorker {
    pub fn new(catalog: ScoringCatalog) -> Self {
        Self { catalog }
    }

    fn is_tech(&self, title: &str, description: &str) -> bool {
        let lower = format!("{title} {description}").to_lowercase();
        self.catalog.tech_indicators.iter().any(|kw| lower.contains(kw.as_str()))
    }

    /// Count of the five domain-relevance indicators present (spec §4.4.5 (a)-(e)).
    fn indicators_found(&self, resume: &Resume, job: &Job, skill_score: f64) -> usize {
        let resume_lower = resume.body.to_lowercase();
        let desc_lower = job.description.to_lowercase();
        let title_lower = job.title.to_lowercase();

        let mut count = 0;
        if self.catalog.tech_indicators.iter().any(|kw| resume_lower.contains(kw.as_str())) {
            count += 1;
        }
        if resume.skills.iter().any(|s| desc_lower.contains(&s.to_lowercase())) {
            count += 1;
        }
        if title_lower.split_whitespace().any(|tok| !tok.is_empty() && resume_lower.contains(tok)) {
            count += 1;
        }
        if resume
            .education
            .iter()
            .any(|e| self.catalog.tech_indicators.iter().any(|kw| e.to_lowercase().contains(kw.as_str())))
        {
            count += 1;
        }
        if skill_score >= 50.0 {
            count += 1;
        }
        count
    }
}

/// Pure blend, exposed for unit tests independent of I/O.
pub(crate) fn blend(s_e: f64, s_d: f64, s_a: f64) -> f64 {
    100.0 * (0.4 * s_e + 0.3 * s_d + 0.3 * s_a)
}

#[async_trait]
impl ScoringWorker for SemanticWorker {
    fn kind(&self) -> DimensionKind {
        DimensionKind::Semantic
    }

    async fn run(
        &self,
        resume_id: &ResumeId,
        job_id: &JobId,
        data_url: &str,
        ctx: &WorkerContext,
    ) -> Result<WorkerResult> {
        let start = Instant::now();
        let (resume, job) = load_pair(resume_id, job_id, data_url).await?;

        if resume.embedding.is_empty() || job.embedding.is_empty() || resume.embedding.len() != job.embedding.len() {
            let detail = json!({ "error": "embeddings missing or mismatched dimension", "raw_cosine": 0.0 });
            return Ok(WorkerResult {
                fork_id: String::new(),
                kind: DimensionKind::Semantic,
                score: 0.0,
                processing_time_ms: elapsed_ms(start),
                detail,
            });
        }

        let cosine = cosine_similarity(&resume.embedding, &job.embedding) as f64;
        let s_e = (cosine + 1.0) / 2.0;

        let (score, s_d, s_a) = match ctx.skill_score {
            None => (100.0 * s_e, None, None),
            Some(skill_score) => {
                let tech = self.is_tech(&job.title, &job.description);
                let s_d = if tech {
                    let found = self.indicators_found(&resume, &job, skill_score);
                    (0.3 + 0.7 * found as f64 / 5.0).clamp(0.0, 1.0)
                } else {
                    0.6
                };
                let s_a = if tech && skill_score < 40.0 {
                    0.2
                } else if skill_score > 70.0 {
                    skill_score / 100.0
                } else {
                    s_e
                };
                (blend(s_e, s_d, s_a), Some(s_d), Some(s_a))
            }
        };

        let detail = json!({
            "raw_cosine": cosine,
            "s_e": s_e,
            "s_d": s_d,
            "s_a": s_a,
            "skill_score_used": ctx.skill_score,
        });

        Ok(WorkerResult {
            fork_id: String::new(),
            kind: DimensionKind::Semantic,
            score: validate_score(score)?,
            processing_time_ms: elapsed_ms(start),
            detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_embeddings_yield_full_raw_similarity() {
        let a = [1.0, 0.0, 0.0];
        let b = [1.0, 0.0, 0.0];
        let cosine = cosine_similarity(&a, &b) as f64;
        let s_e = (cosine + 1.0) / 2.0;
        assert!((s_e - 1.0).abs() < 0.001);
    }

    #[test]
    fn fallback_blend_is_pure_raw_similarity() {
        assert_eq!(blend(1.0, 0.0, 0.0) / 0.4, 100.0);
    }

    #[test]
    fn orthogonal_embeddings_yield_baseline_half() {
        let a = [1.0, 0.0];
        let b = [0.0, 1.0];
        let cosine = cosine_similarity(&a, &b) as f64;
        let s_e = (cosine + 1.0) / 2.0;
        assert!((s_e - 0.5).abs() < 0.001);
    }
}
