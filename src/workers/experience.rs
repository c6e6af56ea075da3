//! Experience dimension (spec §4.4.2). Candidate years and required years are
//! already extracted upstream — résumé field parsing is explicitly out of
//! scope (spec §1) — so this worker only applies the ratio formula.

use super::{elapsed_ms, load_pair, validate_score, ScoringWorker, WorkerContext};
use crate::error::Result;
use crate::types::{DimensionKind, JobId, ResumeId, WorkerResult};
use async_trait::async_trait;
use serde_json::json;
use std::time::Instant;

#[derive(Default)]
pub struct ExperienceWorker;

impl ExperienceWorker {
    pub fn new() -> Self {
        Self
    }
}

/// Pure formula (spec §4.4.2), exposed for the monotonicity property test.
pub(crate) fn compute(y_c: u32, y_r: u32) -> f64 {
    let y_c = y_c.min(80);
    if y_r == 0 || y_c >= y_r {
        100.0
    } else if y_c == 0 {
        0.0
    } else {
        100.0 * y_c as f64 / y_r as f64
    }
}

#[async_trait]
impl ScoringWorker for ExperienceWorker {
    fn kind(&self) -> DimensionKind {
        DimensionKind::Experience
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

        let y_c = resume.years_experience;
        let y_r = job.required_years;
        let score = compute(y_c, y_r);

        let detail = json!({
            "candidate_years": y_c.min(80),
            "required_years": y_r,
            "requirement_met": y_r == 0 || y_c >= y_r,
        });

        Ok(WorkerResult {
            fork_id: String::new(),
            kind: DimensionKind::Experience,
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
    fn no_requirement_is_always_full_score() {
        assert_eq!(compute(0, 0), 100.0);
        assert_eq!(compute(10, 0), 100.0);
    }

    #[test]
    fn meeting_or_exceeding_requirement_is_full_score() {
        assert_eq!(compute(5, 5), 100.0);
        assert_eq!(compute(6, 5), 100.0);
    }

    #[test]
    fn zero_candidate_years_with_requirement_scores_zero() {
        assert_eq!(compute(0, 5), 0.0);
    }

    #[test]
    fn partial_years_scale_linearly() {
        assert_eq!(compute(2, 5), 40.0);
    }

    #[test]
    fn monotonic_nondecreasing_then_flat() {
        let y_r = 5;
        let scores: Vec<f64> = (0..=10).map(|y_c| compute(y_c, y_r)).collect();
        for window in scores.windows(2) {
            assert!(window[1] >= window[0]);
        }
        assert_eq!(scores[5], scores[10]);
    }

    proptest::proptest! {
        #[test]
        fn score_is_monotonic_in_candidate_years(y_r in 1u32..60, y_c in 0u32..80, step in 0u32..20) {
            let lower = compute(y_c, y_r);
            let higher = compute(y_c.saturating_add(step), y_r);
            prop_assert!(higher >= lower);
        }

        #[test]
        fn score_always_in_range(y_c in 0u32..200, y_r in 0u32..100) {
            let score = compute(y_c, y_r);
            prop_assert!((0.0..=100.0).contains(&score));
        }
    }
}
