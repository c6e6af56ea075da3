//! The Fork/Context Manager actor.
//!
//! Modeled as a `ractor` actor (spec §5: "fork ledger mutations use
//! SERIALIZABLE-equivalent semantics... a single-writer lock per fork_id is
//! sufficient"), the same way the teacher's orchestrator actor serializes
//! work-queue mutations. `Release`, `ListActive`, and `Sweep` are handled
//! directly on the actor's mailbox, which is enough to serialize mutations
//! to any one fork's ledger row (fork ids are unique per acquisition, so
//! there is nothing to serialize *across* forks).
//!
//! `Acquire` is the exception: provisioning a fork can wait on the
//! process-wide active-fork semaphore until some other fork's `Release` is
//! processed. Waiting for that inside `handle()` would block the mailbox —
//! and with it the very `Release` the wait is blocked on — so `Acquire` is
//! spawned off onto its own task instead; only the resulting permit's
//! bookkeeping (an `Arc<Mutex<..>>` independent of actor state) and the
//! final reply are shared with the rest of the manager.

use super::provisioning::{self, PrimaryStore};
use crate::error::{FitscoreError, Result};
use crate::storage::libsql::connection_mode_to_url;
use crate::storage::ResultStore;
use crate::types::{DimensionKind, Fork, ForkState, JobId, ResumeId};
use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Permits held for the lifetime of an active fork, keyed by `fork_id`.
/// Guarded by its own `tokio::sync::Mutex` (not actor state) so the acquire
/// path below can be spawned off the actor's mailbox entirely.
type ActivePermits = Arc<Mutex<HashMap<String, tokio::sync::OwnedSemaphorePermit>>>;

pub enum ForkManagerMessage {
    Acquire {
        kind: DimensionKind,
        resume_id: ResumeId,
        job_id: JobId,
        reply: RpcReplyPort<Result<Fork>>,
    },
    Release {
        fork_id: String,
        outcome: ForkState,
        error: Option<String>,
        reply: RpcReplyPort<Result<()>>,
    },
    ListActive {
        reply: RpcReplyPort<Result<Vec<Fork>>>,
    },
    Sweep,
}

pub struct ForkManagerActor;

pub struct ForkManagerArgs {
    pub store: Arc<dyn ResultStore>,
    pub primary: PrimaryStore,
    pub max_active_forks: usize,
    pub retention_hours: i64,
    pub sweep_interval_secs: u64,
}

pub struct ForkManagerState {
    store: Arc<dyn ResultStore>,
    primary: PrimaryStore,
    semaphore: Arc<Semaphore>,
    retention_hours: i64,
    active_permits: ActivePermits,
    sweep_handle: Option<JoinHandle<()>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Drop for ForkManagerState {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.sweep_handle.take() {
            handle.abort();
        }
    }
}

fn new_fork_id(kind: DimensionKind) -> String {
    let ts = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen();
    format!("fork_{kind}_{ts}_{suffix:08x}")
}

#[ractor::async_trait]
impl Actor for ForkManagerActor {
    type Msg = ForkManagerMessage;
    type State = ForkManagerState;
    type Arguments = ForkManagerArgs;

    async fn pre_start(&self, myself: ActorRef<Self::Msg>, args: Self::Arguments) -> Result<Self::State, ActorProcessingErr> {
        let (shutdown_tx, _) = broadcast::channel(1);
        let mut rx = shutdown_tx.subscribe();
        let interval_secs = args.sweep_interval_secs;
        let sweep_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if myself.cast(ForkManagerMessage::Sweep).is_err() {
                            break;
                        }
                    }
                    _ = rx.recv() => break,
                }
            }
        });

        Ok(ForkManagerState {
            store: args.store,
            primary: args.primary,
            semaphore: Arc::new(Semaphore::new(args.max_active_forks)),
            retention_hours: args.retention_hours,
            active_permits: Arc::new(Mutex::new(HashMap::new())),
            sweep_handle: Some(sweep_handle),
            shutdown_tx,
        })
    }

    async fn handle(&self, _myself: ActorRef<Self::Msg>, message: Self::Msg, state: &mut Self::State) -> Result<(), ActorProcessingErr> {
        match message {
            ForkManagerMessage::Acquire { kind, resume_id, job_id, reply } => {
                // The semaphore wait inside `acquire` can block until a
                // `Release` message frees a permit. Ractor actors process
                // their mailbox strictly sequentially, so awaiting that wait
                // here would stall `handle()` and, with it, every other
                // acquire/release/sweep message for this actor — including
                // the very `Release` that would unblock it. Spawn the work
                // instead; the reply port is answered from that task once a
                // permit is actually held, never from inside the mailbox loop.
                let store = state.store.clone();
                let primary = state.primary.clone();
                let semaphore = state.semaphore.clone();
                let active_permits = state.active_permits.clone();
                tokio::spawn(async move {
                    let result = acquire(store, primary, semaphore, active_permits, kind, resume_id, job_id).await;
                    let _ = reply.send(result);
                });
            }
            ForkManagerMessage::Release { fork_id, outcome, error, reply } => {
                let result = release(state, &fork_id, outcome, error).await;
                let _ = reply.send(result);
            }
            ForkManagerMessage::ListActive { reply } => {
                let result = state.store.list_forks_by_state(ForkState::Active).await;
                let _ = reply.send(result);
            }
            ForkManagerMessage::Sweep => {
                let cutoff = Utc::now() - ChronoDuration::hours(state.retention_hours);
                match state.store.sweep_forks(cutoff).await {
                    Ok(deleted) if deleted > 0 => info!(deleted, "sweeper removed terminal forks"),
                    Ok(_) => debug!("sweeper found nothing to remove"),
                    Err(e) => error!(error = %e, "sweeper failed"),
                }
            }
        }
        Ok(())
    }

    async fn post_stop(&self, _myself: ActorRef<Self::Msg>, state: &mut Self::State) -> Result<(), ActorProcessingErr> {
        let _ = state.shutdown_tx.send(());
        if let Some(handle) = state.sweep_handle.take() {
            handle.abort();
        }
        Ok(())
    }
}

/// Runs entirely off the actor's mailbox (spawned from `handle()`): creates
/// the ledger row, waits for a semaphore permit (which may take until some
/// other fork's `Release` is processed), then provisions. None of this may
/// run on the actor's own task, since the `Release` it may be waiting on is
/// itself only ever processed by that same actor.
async fn acquire(
    store: Arc<dyn ResultStore>,
    primary: PrimaryStore,
    semaphore: Arc<Semaphore>,
    active_permits: ActivePermits,
    kind: DimensionKind,
    resume_id: ResumeId,
    job_id: JobId,
) -> Result<Fork> {
    let fork_id = new_fork_id(kind);
    let now = Utc::now();
    let mut fork = Fork {
        fork_id: fork_id.clone(),
        kind,
        resume_id,
        job_id,
        state: ForkState::Pending,
        created_at: now,
        started_at: None,
        completed_at: None,
        error_message: None,
        data_url: String::new(),
    };
    store.create_fork(&fork).await?;

    if semaphore.available_permits() == 0 {
        warn!(fork_id, "active-fork cap reached, queueing");
    }
    let permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| FitscoreError::Internal(format!("fork semaphore closed: {e}")))?;

    match provisioning::provision(&primary) {
        Ok((mode, strategy)) => {
            let data_url = connection_mode_to_url(&mode);
            store.transition_fork(&fork_id, ForkState::Active, Some(&data_url), None).await?;
            debug!(fork_id, ?strategy, "fork active");
            active_permits.lock().await.insert(fork_id.clone(), permit);
            fork.state = ForkState::Active;
            fork.started_at = Some(Utc::now());
            fork.data_url = data_url;
            Ok(fork)
        }
        Err(e) => {
            drop(permit);
            let message = e.to_string();
            store.transition_fork(&fork_id, ForkState::Failed, None, Some(&message)).await?;
            error!(fork_id, error = %message, "all provisioning strategies failed");
            Err(FitscoreError::NoFork(message))
        }
    }
}

async fn release(state: &mut ForkManagerState, fork_id: &str, outcome: ForkState, error: Option<String>) -> Result<()> {
    if !matches!(outcome, ForkState::Completed | ForkState::Failed) {
        return Err(FitscoreError::Internal(format!("release called with non-terminal state for {fork_id}")));
    }
    state.store.transition_fork(fork_id, outcome, None, error.as_deref()).await?;
    state.active_permits.lock().await.remove(fork_id);
    Ok(())
}

/// Thin async-friendly handle over the actor mailbox, so the Coordinator does
/// not need to know about `ractor`'s reply-port plumbing.
#[derive(Clone)]
pub struct ForkManagerHandle {
    actor: ActorRef<ForkManagerMessage>,
}

pub struct ForkManager;

impl ForkManager {
    pub async fn spawn(args: ForkManagerArgs) -> Result<ForkManagerHandle> {
        let (actor, _join) = Actor::spawn(None, ForkManagerActor, args)
            .await
            .map_err(|e| FitscoreError::Internal(format!("failed to start fork manager: {e}")))?;
        Ok(ForkManagerHandle { actor })
    }
}

impl ForkManagerHandle {
    pub async fn acquire(&self, kind: DimensionKind, resume_id: ResumeId, job_id: JobId) -> Result<Fork> {
        let reply = self
            .actor
            .call(|reply| ForkManagerMessage::Acquire { kind, resume_id, job_id, reply }, Some(Duration::from_secs(60)))
            .await
            .map_err(|e| FitscoreError::Internal(format!("fork manager call failed: {e}")))?;
        reply.success_or(FitscoreError::Internal("fork manager call timed out".into()))?
    }

    pub async fn release(&self, fork_id: String, outcome: ForkState, error: Option<String>) -> Result<()> {
        let reply = self
            .actor
            .call(|reply| ForkManagerMessage::Release { fork_id, outcome, error, reply }, Some(Duration::from_secs(30)))
            .await
            .map_err(|e| FitscoreError::Internal(format!("fork manager call failed: {e}")))?;
        reply.success_or(FitscoreError::Internal("fork manager call timed out".into()))?
    }

    pub async fn list_active(&self) -> Result<Vec<Fork>> {
        let reply = self
            .actor
            .call(|reply| ForkManagerMessage::ListActive { reply }, Some(Duration::from_secs(10)))
            .await
            .map_err(|e| FitscoreError::Internal(format!("fork manager call failed: {e}")))?;
        reply.success_or(FitscoreError::Internal("fork manager call timed out".into()))?
    }
}

/// Small extension so `CallResult<Result<T>>` collapses into `Result<T>` at
/// the call sites above without repeating the match arms three times.
trait CallResultExt<T> {
    fn success_or(self, timeout_err: FitscoreError) -> Result<T>;
}

impl<T> CallResultExt<T> for ractor::CallResult<Result<T>> {
    fn success_or(self, timeout_err: FitscoreError) -> Result<T> {
        match self {
            ractor::CallResult::Success(inner) => inner,
            ractor::CallResult::Timeout => Err(timeout_err),
            ractor::CallResult::SenderError => Err(FitscoreError::Internal("fork manager actor dropped the reply port".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::libsql::{ConnectionMode, LibsqlStore};

    async fn test_handle(max_active_forks: usize) -> ForkManagerHandle {
        let store = Arc::new(LibsqlStore::connect(ConnectionMode::InMemory).await.unwrap());
        ForkManager::spawn(ForkManagerArgs {
            store,
            primary: PrimaryStore::InMemory,
            max_active_forks,
            retention_hours: 24,
            sweep_interval_secs: 3600,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn acquire_then_release_round_trips() {
        let handle = test_handle(10).await;
        let fork = handle
            .acquire(DimensionKind::Skill, ResumeId("r1".into()), JobId("j1".into()))
            .await
            .unwrap();
        assert_eq!(fork.state, ForkState::Active);
        assert!(!fork.data_url.is_empty());

        handle.release(fork.fork_id.clone(), ForkState::Completed, None).await.unwrap();
        let active = handle.list_active().await.unwrap();
        assert!(active.iter().all(|f| f.fork_id != fork.fork_id));
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn cap_of_one_serializes_acquisitions() {
        let handle = test_handle(1).await;
        let first = handle
            .acquire(DimensionKind::Skill, ResumeId("r1".into()), JobId("j1".into()))
            .await
            .unwrap();

        let handle2 = handle.clone();
        let second_task = tokio::spawn(async move {
            handle2.acquire(DimensionKind::Semantic, ResumeId("r1".into()), JobId("j1".into())).await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!second_task.is_finished());

        handle.release(first.fork_id, ForkState::Completed, None).await.unwrap();
        let second = second_task.await.unwrap().unwrap();
        assert_eq!(second.state, ForkState::Active);
    }
}
