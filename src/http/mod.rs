//! The scoring endpoint and the minimal operational surface (spec §6, §10.5).
//!
//! Spec §1 excludes "the HTTP/CLI surface beyond the minimal request/response
//! shapes of the scoring endpoint" and "admin analytics" as out-of-scope
//! *features*. That Non-goal scopes out a broad API surface and an admin UI;
//! it does not excuse the service from carrying the ambient operational
//! concerns every deployment needs — a liveness probe and read-only fork
//! ledger introspection (SPEC_FULL.md §10.5). Both are process-local and
//! read-only; neither is a general analytics surface.

use crate::coordinator::Coordinator;
use crate::error::FitscoreError;
use crate::storage::ResultStore;
use crate::types::{ForkState, JobId, ResumeId};
use crate::utils::string::truncate_at_char_boundary;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Detail strings longer than this are truncated in the `/forks` introspection
/// response; the full message is always in the ledger and in logs.
const FORK_DETAIL_PREVIEW_CHARS: usize = 160;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub result_store: Arc<dyn ResultStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/score", post(score_handler))
        .route("/healthz", get(healthz_handler))
        .route("/forks", get(forks_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub resume_id: String,
    pub job_id: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// `POST /score` (spec §6): the sole scoring endpoint.
#[tracing::instrument(skip(state), fields(resume_id = %req.resume_id, job_id = %req.job_id))]
async fn score_handler(State(state): State<AppState>, Json(req): Json<ScoreRequest>) -> Response {
    let resume_id = ResumeId(req.resume_id);
    let job_id = JobId(req.job_id);

    match state.coordinator.score(resume_id, job_id).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Maps coordinator-level errors to the status codes in spec §6: only
/// `NotFound`, `NoFork`, and internal faults ever reach here, since worker
/// failures are folded into a successful degraded response (spec §7).
fn error_response(err: FitscoreError) -> Response {
    let (status, code) = match &err {
        FitscoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        FitscoreError::NoFork(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable_no_fork"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %err, "internal error handling scoring request");
    }
    (status, Json(ErrorBody { error: format!("{code}: {err}") })).into_response()
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

/// `GET /healthz`: liveness, once the Result Store answers a trivial query.
async fn healthz_handler(State(state): State<AppState>) -> Response {
    match state.result_store.list_forks_by_state(ForkState::Active).await {
        Ok(_) => (StatusCode::OK, Json(HealthBody { status: "ok" })).into_response(),
        Err(e) => {
            error!(error = %e, "healthz: result store unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, Json(HealthBody { status: "unreachable" })).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ForksQuery {
    #[serde(default = "default_state")]
    state: String,
}

fn default_state() -> String {
    "active".to_string()
}

#[derive(Debug, Serialize)]
struct ForkSummary {
    fork_id: String,
    kind: String,
    resume_id: String,
    job_id: String,
    state: String,
    created_at: String,
    error_message: Option<String>,
}

/// `GET /forks?state=active`: read-only fork ledger introspection
/// (SPEC_FULL.md §10.5) — not a general analytics surface.
async fn forks_handler(State(state): State<AppState>, Query(query): Query<ForksQuery>) -> Response {
    let fork_state = match query.state.as_str() {
        "pending" => ForkState::Pending,
        "active" => ForkState::Active,
        "completed" => ForkState::Completed,
        "failed" => ForkState::Failed,
        other => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody { error: format!("unknown fork state: {other}") }),
            )
                .into_response();
        }
    };

    match state.result_store.list_forks_by_state(fork_state).await {
        Ok(forks) => {
            let summaries: Vec<ForkSummary> = forks
                .into_iter()
                .map(|f| ForkSummary {
                    fork_id: f.fork_id,
                    kind: f.kind.to_string(),
                    resume_id: f.resume_id.to_string(),
                    job_id: f.job_id.to_string(),
                    state: format!("{:?}", f.state),
                    created_at: f.created_at.to_rfc3339(),
                    error_message: f.error_message.map(|m| truncate_at_char_boundary(&m, FORK_DETAIL_PREVIEW_CHARS)),
                })
                .collect();
            info!(count = summaries.len(), state = %query.state, "fork introspection query");
            (StatusCode::OK, Json(summaries)).into_response()
        }
        Err(e) => error_response(e),
    }
}

// Request-level behavior of this handler (including the unknown-state
// rejection) is exercised end-to-end against the real router in
// tests/http_test.rs, which drives `forks_handler` itself rather than
// asserting on string literals beside it.
