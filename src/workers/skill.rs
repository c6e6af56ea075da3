//! Skill dimension: word-boundary matches between the résumé's skill tokens
//! and the job description (spec §4.4.1).

use super::{elapsed_ms, load_pair, validate_score, ScoringCatalog, ScoringWorker, WorkerContext};
use crate::error::Result;
use crate::types::{DimensionKind, JobId, ResumeId, WorkerResult};
use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use std::collections::BTreeSet;
use std::time::Instant;

pub struct SkillWorker {
    catalog: ScoringCatalog,
}

impl SkillWorker {
    pub fn new(catalog: ScoringCatalog) -> Self {
        Self { catalog }
    }

    fn extract(&self, text: &str) -> BTreeSet<String> {
        self.catalog
            .skills
            .iter()
            .filter(|skill| word_boundary_contains(text, skill))
            .cloned()
            .collect()
    }

    /// Raw word-boundary occurrence count of `skill` in `text`, capped at 5.
    fn count_occurrences(&self, text: &str, skill: &str) -> usize {
        boundary_regex(skill).map(|re| re.find_iter(text).count().min(5)).unwrap_or(0)
    }
}

fn boundary_regex(needle: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(needle))).ok()
}

fn word_boundary_contains(haystack: &str, needle: &str) -> bool {
    boundary_regex(needle).map(|re| re.is_match(haystack)).unwrap_or(false)
}

/// Pure scoring formula, split out from `run` so the monotonicity properties
/// in spec §8 can be exercised directly in proptest without a fork/session.
pub(crate) fn compute(worker: &SkillWorker, resume_skills: &BTreeSet<String>, job_skills: &BTreeSet<String>, description: &str) -> f64 {
    if resume_skills.is_empty() {
        return 0.0;
    }

    let present_in_desc: Vec<&String> = resume_skills
        .iter()
        .filter(|s| word_boundary_contains(description, s))
        .collect();

    let avg = if present_in_desc.is_empty() {
        0.0
    } else {
        let total: f64 = present_in_desc
            .iter()
            .map(|s| {
                let matches = worker.count_occurrences(description, s);
                let weight = 1.0 + 0.15 * matches.saturating_sub(1).min(3) as f64;
                weight.min(1.5)
            })
            .sum();
        total / present_in_desc.len() as f64
    };

    let penalty = if job_skills.is_empty() {
        0.0
    } else {
        let missing = job_skills.difference(resume_skills).count();
        0.1 * missing as f64 / job_skills.len().max(1) as f64
    };

    (avg - penalty).clamp(0.0, 1.0) * 100.0
}

#[async_trait]
impl ScoringWorker for SkillWorker {
    fn kind(&self) -> DimensionKind {
        DimensionKind::Skill
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

        let resume_skills = self.extract(&resume.body);
        let job_skills = self.extract(&job.description);
        let score = compute(self, &resume_skills, &job_skills, &job.description);

        let matched: Vec<_> = resume_skills.intersection(&job_skills).take(10).cloned().collect();
        let missing: Vec<_> = job_skills.difference(&resume_skills).cloned().collect();

        let detail = json!({
            "matched_skills": matched,
            "missing_skills": missing,
            "resume_skill_count": resume_skills.len(),
            "job_skill_count": job_skills.len(),
        });

        Ok(WorkerResult {
            fork_id: String::new(),
            kind: DimensionKind::Skill,
            score: validate_score(score)?,
            processing_time_ms: elapsed_ms(start),
            detail,
        })
    }
}
