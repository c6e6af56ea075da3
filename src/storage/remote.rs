//! HTTP-backed résumé/job store: the `Http { base_url }` variant of
//! [`crate::config::ResumeJobStoreConfig`] (spec §6 "External collaborators").
//!
//! Résumé/job ingestion itself is out of scope (spec §1); this is a thin
//! client against whatever external service owns that data, matching the
//! `getResume(id) -> Resume | NotFound` / `getJob(id) -> Job | NotFound`
//! contract verbatim.

use crate::error::{FitscoreError, Result};
use crate::storage::ResumeJobStore;
use crate::types::{Job, JobId, Resume, ResumeId};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

pub struct HttpResumeJobStore {
    client: Client,
    base_url: String,
}

impl HttpResumeJobStore {
    pub fn new(base_url: String) -> Self {
        Self { client: Client::new(), base_url: base_url.trim_end_matches('/').to_string() }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp.error_for_status().map_err(FitscoreError::Http)?;
        Ok(Some(resp.json().await?))
    }
}

#[async_trait]
impl ResumeJobStore for HttpResumeJobStore {
    async fn get_resume(&self, id: &ResumeId) -> Result<Option<Resume>> {
        self.get(&format!("/resumes/{}", id.0)).await
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>> {
        self.get(&format!("/jobs/{}", id.0)).await
    }
}
