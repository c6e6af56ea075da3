//! Core data types for the fitness scoring coordinator
//!
//! This module defines the entities from spec §3: `Resume` and `Job` (external,
//! read-only), `DimensionKind`, `Fork`, `WorkerResult`, and `CompositeScore`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque résumé identifier, as handed to us by the external résumé store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResumeId(pub String);

impl std::fmt::Display for ResumeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResumeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque job identifier, as handed to us by the external job store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Résumé, as read (read-only) from the external résumé store (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resume {
    pub resume_id: ResumeId,

    /// Free-text body, used for word-boundary skill/certification/experience extraction.
    pub body: String,

    /// Case-normalized, deduplicated skill tokens.
    pub skills: Vec<String>,

    pub years_experience: u32,

    /// Ordered education entries (most recent / highest degree first is not assumed).
    pub education: Vec<String>,

    /// Ordered certification entries.
    pub certifications: Vec<String>,

    /// Fixed-dimension unit embedding vector, opaque to this crate.
    pub embedding: Vec<f32>,
}

/// Job description, as read (read-only) from the external job store (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,

    /// Title, ≤300 chars per spec.
    pub title: String,

    /// Description, 10–50,000 chars per spec.
    pub description: String,

    /// Non-negative; 0 means "no stated requirement".
    pub required_years: u32,

    /// Fixed-dimension unit embedding vector, opaque to this crate, same D as résumé.
    pub embedding: Vec<f32>,
}

/// The closed set of scoring dimensions (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    Skill,
    Semantic,
    Experience,
    Education,
    Certification,
}

impl DimensionKind {
    /// All five dimensions, in a fixed canonical order used for weight vectors
    /// and response maps. Dispatch order does not matter (spec §4.3 Ordering
    /// guarantees); this order only fixes iteration/display order.
    pub const ALL: [DimensionKind; 5] = [
        DimensionKind::Skill,
        DimensionKind::Semantic,
        DimensionKind::Experience,
        DimensionKind::Education,
        DimensionKind::Certification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DimensionKind::Skill => "skill",
            DimensionKind::Semantic => "semantic",
            DimensionKind::Experience => "experience",
            DimensionKind::Education => "education",
            DimensionKind::Certification => "certification",
        }
    }
}

impl std::fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of a [`Fork`]. Progresses `Pending -> Active -> (Completed | Failed)`
/// and never backwards (spec §3 invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForkState {
    Pending,
    Active,
    Completed,
    Failed,
}

/// A provisioned data-access context, owned by the Fork/Context Manager until
/// handed to its worker, and by the worker while `Active` (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fork {
    pub fork_id: String,
    pub kind: DimensionKind,
    pub resume_id: ResumeId,
    pub job_id: JobId,
    pub state: ForkState,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,

    /// Opaque handle the worker uses verbatim to read résumé/job data.
    pub data_url: String,
}

/// The provisioning strategy that actually succeeded for a fork (spec §4.1, §9).
/// Workers must never branch on this; it exists purely for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionStrategy {
    ZeroCopyFork,
    PhysicalClone,
    LogicalContext,
}

/// One worker's raw output before it is persisted (spec §4.4 common contract).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResult {
    pub fork_id: String,
    pub kind: DimensionKind,
    /// In [0, 100], finite.
    pub score: f64,
    pub processing_time_ms: u64,
    pub detail: serde_json::Value,
}

/// Upserted per (resume_id, job_id) composite (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeScore {
    pub resume_id: ResumeId,
    pub job_id: JobId,
    pub skill: f64,
    pub semantic: f64,
    pub experience: f64,
    pub education: f64,
    pub certification: f64,
    /// In [0, 100], two-decimal precision.
    pub composite: f64,
    pub agents_completed: u8,
    pub total_processing_time_ms: u64,
    pub profile_tag: String,
    pub created_at: DateTime<Utc>,
}
