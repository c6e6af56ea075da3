//! libsql-backed Result Store and local Résumé/Job Store.
//!
//! `ConnectionMode` mirrors the three ways the Fork/Context Manager can open a
//! connection against the primary store (spec §4.1): a zero-copy fork is
//! modeled as `EmbeddedReplica` (a synced logical view), a physical clone as a
//! freshly copied `Local` file, and a logical context as a plain fresh `Local`
//! or `InMemory` connection. This enum only describes *how a connection was
//! opened*; it carries no scoring semantics.

use crate::error::{FitscoreError, Result};
use crate::storage::{ResultStore, ResumeJobStore};
use crate::types::{
    CompositeScore, DimensionKind, Fork, ForkState, Job, JobId, Resume, ResumeId, WorkerResult,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use libsql::{params, Builder, Connection, Database};
use tracing::{debug, warn};

/// How a connection to the primary store was actually established.
#[derive(Debug, Clone)]
pub enum ConnectionMode {
    /// Local file-based database.
    Local(String),
    /// Local file-based database opened as a fresh session only (no physical
    /// isolation); backs the Fork/Context Manager's "logical context" strategy.
    LocalReadOnly(String),
    /// In-memory database, used for tests and for fully ephemeral forks.
    InMemory,
    /// Remote database (Turso Cloud or equivalent).
    Remote { url: String, token: String },
    /// Embedded replica with sync; backs the "zero-copy fork" strategy.
    EmbeddedReplica {
        path: String,
        url: String,
        token: String,
    },
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS fork_ledger (
    fork_id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    resume_id TEXT NOT NULL,
    job_id TEXT NOT NULL,
    state TEXT NOT NULL,
    created_at TEXT NOT NULL,
    started_at TEXT,
    completed_at TEXT,
    error_message TEXT,
    data_url TEXT
);
CREATE INDEX IF NOT EXISTS idx_fork_ledger_state_created ON fork_ledger(state, created_at);

CREATE TABLE IF NOT EXISTS worker_result (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    fork_id TEXT NOT NULL,
    resume_id TEXT NOT NULL,
    job_id TEXT NOT NULL,
    score REAL NOT NULL,
    processing_time_ms INTEGER NOT NULL,
    detail TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_worker_result_resume_job ON worker_result(resume_id, job_id);

CREATE TABLE IF NOT EXISTS composite_score (
    resume_id TEXT NOT NULL,
    job_id TEXT NOT NULL,
    skill REAL NOT NULL,
    semantic REAL NOT NULL,
    experience REAL NOT NULL,
    education REAL NOT NULL,
    certification REAL NOT NULL,
    composite REAL NOT NULL,
    agents_completed INTEGER NOT NULL,
    total_processing_time_ms INTEGER NOT NULL,
    profile_tag TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(resume_id, job_id)
);
CREATE INDEX IF NOT EXISTS idx_composite_score_desc ON composite_score(composite DESC);

CREATE TABLE IF NOT EXISTS resumes (
    resume_id TEXT PRIMARY KEY,
    body TEXT NOT NULL,
    skills TEXT NOT NULL,
    years_experience INTEGER NOT NULL,
    education TEXT NOT NULL,
    certifications TEXT NOT NULL,
    embedding TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS jobs (
    job_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    required_years INTEGER NOT NULL,
    embedding TEXT NOT NULL
);
"#;

/// Serialize a [`ConnectionMode`] into the opaque `data_url` a worker receives
/// from the Fork/Context Manager (spec §4.1, §6 GLOSSARY). Internal wire
/// format only; workers must treat the string as opaque.
pub fn connection_mode_to_url(mode: &ConnectionMode) -> String {
    match mode {
        ConnectionMode::Local(path) => format!("local:{path}"),
        ConnectionMode::LocalReadOnly(path) => format!("localro:{path}"),
        ConnectionMode::InMemory => "memory:".to_string(),
        ConnectionMode::Remote { url, token } => format!("remote:{url}|{token}"),
        ConnectionMode::EmbeddedReplica { path, url, token } => format!("replica:{path}|{url}|{token}"),
    }
}

pub fn url_to_connection_mode(data_url: &str) -> Result<ConnectionMode> {
    let (scheme, rest) = data_url
        .split_once(':')
        .ok_or_else(|| FitscoreError::Internal(format!("malformed data_url: {data_url}")))?;
    match scheme {
        "local" => Ok(ConnectionMode::Local(rest.to_string())),
        "localro" => Ok(ConnectionMode::LocalReadOnly(rest.to_string())),
        "memory" => Ok(ConnectionMode::InMemory),
        "remote" => {
            let (url, token) = rest
                .split_once('|')
                .ok_or_else(|| FitscoreError::Internal(format!("malformed remote data_url: {data_url}")))?;
            Ok(ConnectionMode::Remote { url: url.to_string(), token: token.to_string() })
        }
        "replica" => {
            let mut parts = rest.splitn(3, '|');
            let (Some(path), Some(url), Some(token)) = (parts.next(), parts.next(), parts.next()) else {
                return Err(FitscoreError::Internal(format!("malformed replica data_url: {data_url}")));
            };
            Ok(ConnectionMode::EmbeddedReplica { path: path.to_string(), url: url.to_string(), token: token.to_string() })
        }
        other => Err(FitscoreError::Internal(format!("unknown data_url scheme: {other}"))),
    }
}

async fn open(mode: &ConnectionMode) -> Result<Database> {
    let db = match mode {
        ConnectionMode::Local(path) | ConnectionMode::LocalReadOnly(path) => {
            Builder::new_local(path).build().await.map_err(|e| {
                FitscoreError::Database(e)
            })?
        }
        ConnectionMode::InMemory => Builder::new_local(":memory:").build().await?,
        ConnectionMode::Remote { url, token } => {
            Builder::new_remote(url.clone(), token.clone()).build().await?
        }
        ConnectionMode::EmbeddedReplica { path, url, token } => {
            Builder::new_remote_replica(path.clone(), url.clone(), token.clone())
                .build()
                .await?
        }
    };
    Ok(db)
}

/// libsql-backed implementation of both [`ResultStore`] and (for local/demo
/// deployments) [`ResumeJobStore`].
pub struct LibsqlStore {
    db: Database,
}

impl LibsqlStore {
    pub async fn connect(mode: ConnectionMode) -> Result<Self> {
        let db = open(&mode).await?;
        let store = Self { db };
        store.migrate().await?;
        Ok(store)
    }

    async fn conn(&self) -> Result<Connection> {
        Ok(self.db.connect()?)
    }

    /// Trivial round-trip used by workers to verify a freshly opened session
    /// is live before reading through it (spec §4.4 common contract).
    pub async fn ping(&self) -> Result<()> {
        let conn = self.conn().await?;
        conn.query("SELECT 1", ()).await?;
        Ok(())
    }

    async fn migrate(&self) -> Result<()> {
        let conn = self.conn().await?;
        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            conn.execute(statement, ()).await?;
        }
        debug!("applied fork/result-store schema");
        Ok(())
    }

    /// Write a résumé row into the embedded `Local` store. Résumé ingestion is
    /// out of scope for the core (spec §1); this exists only for `Local`-mode
    /// deployments and for seeding test fixtures, mirroring how an external
    /// ingestion pipeline would populate the same table.
    pub async fn put_resume(&self, resume: &Resume) -> Result<()> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO resumes (resume_id, body, skills, years_experience, education, certifications, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(resume_id) DO UPDATE SET
                body = excluded.body, skills = excluded.skills, years_experience = excluded.years_experience,
                education = excluded.education, certifications = excluded.certifications, embedding = excluded.embedding",
            params![
                resume.resume_id.0.clone(),
                resume.body.clone(),
                serde_json::to_string(&resume.skills)?,
                resume.years_experience as i64,
                serde_json::to_string(&resume.education)?,
                serde_json::to_string(&resume.certifications)?,
                serde_json::to_string(&resume.embedding)?,
            ],
        )
        .await?;
        Ok(())
    }

    /// Write a job row into the embedded `Local` store; see [`Self::put_resume`].
    pub async fn put_job(&self, job: &Job) -> Result<()> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO jobs (job_id, title, description, required_years, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(job_id) DO UPDATE SET
                title = excluded.title, description = excluded.description,
                required_years = excluded.required_years, embedding = excluded.embedding",
            params![
                job.job_id.0.clone(),
                job.title.clone(),
                job.description.clone(),
                job.required_years as i64,
                serde_json::to_string(&job.embedding)?,
            ],
        )
        .await?;
        Ok(())
    }

    fn fork_from_row(row: &libsql::Row) -> Result<Fork> {
        let kind = parse_kind(&row.get::<String>(1)?)?;
        let state = parse_state(&row.get::<String>(4)?)?;
        Ok(Fork {
            fork_id: row.get(0)?,
            kind,
            resume_id: ResumeId(row.get(2)?),
            job_id: JobId(row.get(3)?),
            state,
            created_at: parse_ts(&row.get::<String>(5)?)?,
            started_at: row.get::<Option<String>>(6)?.map(|s| parse_ts(&s)).transpose()?,
            completed_at: row.get::<Option<String>>(7)?.map(|s| parse_ts(&s)).transpose()?,
            error_message: row.get(8)?,
            data_url: row.get::<Option<String>>(9)?.unwrap_or_default(),
        })
    }
}

fn parse_kind(s: &str) -> Result<DimensionKind> {
    match s {
        "skill" => Ok(DimensionKind::Skill),
        "semantic" => Ok(DimensionKind::Semantic),
        "experience" => Ok(DimensionKind::Experience),
        "education" => Ok(DimensionKind::Education),
        "certification" => Ok(DimensionKind::Certification),
        other => Err(FitscoreError::Internal(format!("unknown dimension kind in ledger: {other}"))),
    }
}

fn parse_state(s: &str) -> Result<ForkState> {
    match s {
        "pending" => Ok(ForkState::Pending),
        "active" => Ok(ForkState::Active),
        "completed" => Ok(ForkState::Completed),
        "failed" => Ok(ForkState::Failed),
        other => Err(FitscoreError::Internal(format!("unknown fork state in ledger: {other}"))),
    }
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| FitscoreError::Internal(format!("bad timestamp '{s}': {e}")))
}

fn state_str(state: ForkState) -> &'static str {
    match state {
        ForkState::Pending => "pending",
        ForkState::Active => "active",
        ForkState::Completed => "completed",
        ForkState::Failed => "failed",
    }
}

#[async_trait]
impl ResultStore for LibsqlStore {
    async fn create_fork(&self, fork: &Fork) -> Result<()> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO fork_ledger (fork_id, kind, resume_id, job_id, state, created_at, started_at, completed_at, error_message, data_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, NULL, NULL, ?7)",
            params![
                fork.fork_id.clone(),
                fork.kind.as_str(),
                fork.resume_id.0.clone(),
                fork.job_id.0.clone(),
                state_str(fork.state),
                fork.created_at.to_rfc3339(),
                fork.data_url.clone(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn transition_fork(
        &self,
        fork_id: &str,
        state: ForkState,
        data_url: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn().await?;
        let now = Utc::now().to_rfc3339();
        match state {
            ForkState::Active => {
                conn.execute(
                    "UPDATE fork_ledger SET state = ?1, started_at = ?2, data_url = COALESCE(?3, data_url) WHERE fork_id = ?4",
                    params![state_str(state), now, data_url, fork_id],
                )
                .await?;
            }
            ForkState::Completed | ForkState::Failed => {
                conn.execute(
                    "UPDATE fork_ledger SET state = ?1, completed_at = ?2, error_message = ?3 WHERE fork_id = ?4",
                    params![state_str(state), now, error_message, fork_id],
                )
                .await?;
            }
            ForkState::Pending => {
                warn!(fork_id, "ignoring no-op transition back to pending");
            }
        }
        Ok(())
    }

    async fn get_fork(&self, fork_id: &str) -> Result<Option<Fork>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                "SELECT fork_id, kind, resume_id, job_id, state, created_at, started_at, completed_at, error_message, data_url
                 FROM fork_ledger WHERE fork_id = ?1",
                params![fork_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::fork_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_forks_by_state(&self, state: ForkState) -> Result<Vec<Fork>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                "SELECT fork_id, kind, resume_id, job_id, state, created_at, started_at, completed_at, error_message, data_url
                 FROM fork_ledger WHERE state = ?1 ORDER BY created_at DESC",
                params![state_str(state)],
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::fork_from_row(&row)?);
        }
        Ok(out)
    }

    async fn sweep_forks(&self, older_than: DateTime<Utc>) -> Result<u64> {
        let conn = self.conn().await?;
        let cutoff = older_than.to_rfc3339();
        conn.execute(
            "DELETE FROM fork_ledger WHERE state IN ('completed', 'failed') AND created_at < ?1",
            params![cutoff],
        )
        .await
        .map_err(FitscoreError::from)?;
        Ok(conn.changes())
    }

    async fn write_worker_result(&self, kind: DimensionKind, result: &WorkerResult) -> Result<()> {
        let conn = self.conn().await?;
        let fork = self
            .get_fork(&result.fork_id)
            .await?
            .ok_or_else(|| FitscoreError::Internal(format!("write_worker_result: unknown fork {}", result.fork_id)))?;
        conn.execute(
            "INSERT INTO worker_result (kind, fork_id, resume_id, job_id, score, processing_time_ms, detail, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                kind.as_str(),
                result.fork_id.clone(),
                fork.resume_id.0.clone(),
                fork.job_id.0.clone(),
                result.score,
                result.processing_time_ms as i64,
                result.detail.to_string(),
                Utc::now().to_rfc3339(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn upsert_composite(&self, composite: &CompositeScore) -> Result<()> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO composite_score
                (resume_id, job_id, skill, semantic, experience, education, certification, composite,
                 agents_completed, total_processing_time_ms, profile_tag, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(resume_id, job_id) DO UPDATE SET
                skill = excluded.skill,
                semantic = excluded.semantic,
                experience = excluded.experience,
                education = excluded.education,
                certification = excluded.certification,
                composite = excluded.composite,
                agents_completed = excluded.agents_completed,
                total_processing_time_ms = excluded.total_processing_time_ms,
                profile_tag = excluded.profile_tag,
                created_at = excluded.created_at",
            params![
                composite.resume_id.0.clone(),
                composite.job_id.0.clone(),
                composite.skill,
                composite.semantic,
                composite.experience,
                composite.education,
                composite.certification,
                composite.composite,
                composite.agents_completed as i64,
                composite.total_processing_time_ms as i64,
                composite.profile_tag.clone(),
                composite.created_at.to_rfc3339(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn get_composite(&self, resume_id: &ResumeId, job_id: &JobId) -> Result<Option<CompositeScore>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                "SELECT resume_id, job_id, skill, semantic, experience, education, certification, composite,
                        agents_completed, total_processing_time_ms, profile_tag, created_at
                 FROM composite_score WHERE resume_id = ?1 AND job_id = ?2",
                params![resume_id.0.clone(), job_id.0.clone()],
            )
            .await?;
        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        Ok(Some(CompositeScore {
            resume_id: ResumeId(row.get(0)?),
            job_id: JobId(row.get(1)?),
            skill: row.get(2)?,
            semantic: row.get(3)?,
            experience: row.get(4)?,
            education: row.get(5)?,
            certification: row.get(6)?,
            composite: row.get(7)?,
            agents_completed: row.get::<i64>(8)? as u8,
            total_processing_time_ms: row.get::<i64>(9)? as u64,
            profile_tag: row.get(10)?,
            created_at: parse_ts(&row.get::<String>(11)?)?,
        }))
    }
}

#[async_trait]
impl ResumeJobStore for LibsqlStore {
    async fn get_resume(&self, id: &ResumeId) -> Result<Option<Resume>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                "SELECT resume_id, body, skills, years_experience, education, certifications, embedding
                 FROM resumes WHERE resume_id = ?1",
                params![id.0.clone()],
            )
            .await?;
        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        Ok(Some(Resume {
            resume_id: ResumeId(row.get(0)?),
            body: row.get(1)?,
            skills: serde_json::from_str(&row.get::<String>(2)?)?,
            years_experience: row.get::<i64>(3)? as u32,
            education: serde_json::from_str(&row.get::<String>(4)?)?,
            certifications: serde_json::from_str(&row.get::<String>(5)?)?,
            embedding: serde_json::from_str(&row.get::<String>(6)?)?,
        }))
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                "SELECT job_id, title, description, required_years, embedding FROM jobs WHERE job_id = ?1",
                params![id.0.clone()],
            )
            .await?;
        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        Ok(Some(Job {
            job_id: JobId(row.get(0)?),
            title: row.get(1)?,
            description: row.get(2)?,
            required_years: row.get::<i64>(3)? as u32,
            embedding: serde_json::from_str(&row.get::<String>(4)?)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_round_trips_each_mode() {
        let modes = vec![
            ConnectionMode::Local("/tmp/a.db".into()),
            ConnectionMode::LocalReadOnly("/tmp/b.db".into()),
            ConnectionMode::InMemory,
            ConnectionMode::Remote { url: "https://example.turso.io".into(), token: "tok".into() },
            ConnectionMode::EmbeddedReplica {
                path: "/tmp/c.db".into(),
                url: "https://example.turso.io".into(),
                token: "tok".into(),
            },
        ];
        for mode in modes {
            let url = connection_mode_to_url(&mode);
            let parsed = url_to_connection_mode(&url).unwrap();
            assert_eq!(format!("{mode:?}"), format!("{parsed:?}"));
        }
    }

    async fn seed(store: &LibsqlStore, resume: &Resume, job: &Job) {
        store.put_resume(resume).await.unwrap();
        store.put_job(job).await.unwrap();
    }

    #[tokio::test]
    async fn fork_lifecycle_round_trips() {
        let store = LibsqlStore::connect(ConnectionMode::InMemory).await.unwrap();
        let fork = Fork {
            fork_id: "fork_skill_1_abc".into(),
            kind: DimensionKind::Skill,
            resume_id: ResumeId("r1".into()),
            job_id: JobId("j1".into()),
            state: ForkState::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
            data_url: String::new(),
        };
        store.create_fork(&fork).await.unwrap();
        store
            .transition_fork(&fork.fork_id, ForkState::Active, Some("sqlite::memory:"), None)
            .await
            .unwrap();
        let active = store.get_fork(&fork.fork_id).await.unwrap().unwrap();
        assert_eq!(active.state, ForkState::Active);
        assert!(active.started_at.is_some());

        store
            .transition_fork(&fork.fork_id, ForkState::Completed, None, None)
            .await
            .unwrap();
        let done = store.get_fork(&fork.fork_id).await.unwrap().unwrap();
        assert_eq!(done.state, ForkState::Completed);
        assert!(done.completed_at.is_some());
    }

    #[tokio::test]
    async fn composite_upsert_overwrites() {
        let store = LibsqlStore::connect(ConnectionMode::InMemory).await.unwrap();
        let mut composite = CompositeScore {
            resume_id: ResumeId("r1".into()),
            job_id: JobId("j1".into()),
            skill: 80.0,
            semantic: 70.0,
            experience: 100.0,
            education: 100.0,
            certification: 50.0,
            composite: 81.0,
            agents_completed: 5,
            total_processing_time_ms: 120,
            profile_tag: "Default".into(),
            created_at: Utc::now(),
        };
        store.upsert_composite(&composite).await.unwrap();
        composite.composite = 90.0;
        store.upsert_composite(&composite).await.unwrap();

        let fetched = store
            .get_composite(&ResumeId("r1".into()), &JobId("j1".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.composite, 90.0);
    }

    #[tokio::test]
    async fn resume_and_job_round_trip() {
        let store = LibsqlStore::connect(ConnectionMode::InMemory).await.unwrap();
        let resume = Resume {
            resume_id: ResumeId("r1".into()),
            body: "Python developer".into(),
            skills: vec!["python".into()],
            years_experience: 5,
            education: vec!["BS Computer Science".into()],
            certifications: vec![],
            embedding: vec![1.0, 0.0],
        };
        let job = Job {
            job_id: JobId("j1".into()),
            title: "Senior Python Developer".into(),
            description: "Python, Django, 5+ years".into(),
            required_years: 5,
            embedding: vec![1.0, 0.0],
        };
        seed(&store, &resume, &job).await;

        let fetched_resume = store.get_resume(&resume.resume_id).await.unwrap().unwrap();
        assert_eq!(fetched_resume.skills, vec!["python".to_string()]);
        let fetched_job = store.get_job(&job.job_id).await.unwrap().unwrap();
        assert_eq!(fetched_job.required_years, 5);
    }

    #[tokio::test]
    async fn sweep_deletes_only_old_terminal_forks() {
        let store = LibsqlStore::connect(ConnectionMode::InMemory).await.unwrap();
        let old = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let fork = Fork {
            fork_id: "fork_skill_old".into(),
            kind: DimensionKind::Skill,
            resume_id: ResumeId("r1".into()),
            job_id: JobId("j1".into()),
            state: ForkState::Completed,
            created_at: old,
            started_at: Some(old),
            completed_at: Some(old),
            error_message: None,
            data_url: "x".into(),
        };
        store.create_fork(&fork).await.unwrap();
        let deleted = store.sweep_forks(Utc::now()).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get_fork(&fork.fork_id).await.unwrap().is_none());
    }
}
