use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, error};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::sumo::{CreatedJob, JobStatus, MessagesPage, RawMessage};
use crate::query::SearchSpec;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API error {status}: {body}")]
    RequestFailed { status: StatusCode, body: String },
    #[error("transport failure: {0}")]
    TransportFailed(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    InvalidResponse(#[from] serde_json::Error),
    #[error("invalid credentials header: {0}")]
    InvalidCredentials(#[from] reqwest::header::InvalidHeaderValue),
}

/// Where the search API lives and who we are to it.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_url: String,
    pub access_id: String,
    pub access_key: String,
}

impl Credentials {
    pub fn basic_auth_header(&self) -> String {
        let pair = format!("{}:{}", self.access_id, self.access_key);
        format!("Basic {}", STANDARD.encode(pair))
    }
}

/// A session against the search-job API. Each instance owns its cookie jar,
/// so concurrent workers must build their own instead of cloning one.
pub struct SumoClient {
    base_url: String,
    client: Client,
}

impl SumoClient {
    pub fn new(credentials: &Credentials) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&credentials.basic_auth_header())?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .build()?;

        // Ensure base_url doesn't end with slash for consistency
        let base_url = credentials.api_url.trim_end_matches('/').to_string();

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn jobs_url(&self) -> String {
        format!("{}/api/v1/search/jobs", self.base_url)
    }

    fn job_url(&self, job_id: &str) -> String {
        format!("{}/api/v1/search/jobs/{}", self.base_url, job_id)
    }

    /// Creates a search job. Only `202 Accepted` counts as success.
    pub async fn submit(&self, spec: &SearchSpec) -> Result<String, ApiError> {
        let response = self
            .client
            .post(self.jobs_url())
            .json(&spec.to_request())
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status != StatusCode::ACCEPTED {
            error!("Error creating search job: {} {}", status, text);
            return Err(ApiError::RequestFailed { status, body: text });
        }

        let job: CreatedJob = serde_json::from_str(&text)?;
        Ok(job.id)
    }

    pub async fn status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        let response = self.client.get(self.job_url(job_id)).send().await?;
        read_json(response).await
    }

    /// One page of messages. An empty page means there is nothing more to read.
    pub async fn fetch_page(
        &self,
        job_id: &str,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<RawMessage>, ApiError> {
        let url = format!("{}/messages", self.job_url(job_id));

        let response = self
            .client
            .get(&url)
            .query(&[("offset", offset.to_string()), ("limit", limit.to_string())])
            .send()
            .await?;

        let page: MessagesPage = read_json(response).await?;
        Ok(page.messages)
    }

    pub async fn delete(&self, job_id: &str) -> Result<(), ApiError> {
        let response = self.client.delete(self.job_url(job_id)).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::RequestFailed { status, body });
        }
        Ok(())
    }

    /// Deletes the job and only logs a failure.
    pub async fn delete_quietly(&self, job_id: &str) {
        if let Err(e) = self.delete(job_id).await {
            debug!("Failed to delete search job {}: {}", job_id, e);
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let text = response.text().await?;

    if status != StatusCode::OK {
        return Err(ApiError::RequestFailed { status, body: text });
    }

    Ok(serde_json::from_str(&text)?)
}
