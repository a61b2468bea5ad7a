use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{ApiError, JobApi, JobPage, TransitionAck};
use crate::domain::job::Filter;
use crate::domain::settings::DashboardConfig;

/// REST API を使用したジョブ API クライアント
pub struct HttpJobApi {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Serialize)]
struct ApproveRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
}

#[derive(Serialize)]
struct RejectRequest<'a> {
    reason: &'a str,
}

impl HttpJobApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        // タイムアウトはここで強制し、超過は ApiError::Timeout として返す
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Http(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self, ApiError> {
        Self::new(&config.api_base_url, config.request_timeout())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn jobs_url(&self, filter: Filter) -> Result<Url, ApiError> {
        let mut url = self.endpoint(&["api", "jobs"])?;
        if let Filter::Status(status) = filter {
            url.query_pairs_mut().append_pair("status", status.as_str());
        }
        Ok(url)
    }
}

fn map_send_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Http(e.to_string())
    }
}

async fn send(request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
    let response = request.send().await.map_err(map_send_error)?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status { status, body });
    }

    Ok(response)
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
    send(request)
        .await?
        .json::<T>()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::Decode(e.to_string())
            }
        })
}

#[async_trait]
impl JobApi for HttpJobApi {
    async fn fetch_jobs(&self, filter: Filter) -> Result<JobPage, ApiError> {
        let url = self.jobs_url(filter)?;
        send_json(self.client.get(url)).await
    }

    async fn approve_job(
        &self,
        job_id: &str,
        notes: Option<&str>,
    ) -> Result<TransitionAck, ApiError> {
        let url = self.endpoint(&["api", "jobs", job_id, "approve"])?;
        send_json(self.client.post(url).json(&ApproveRequest { notes })).await
    }

    async fn reject_job(&self, job_id: &str, reason: &str) -> Result<TransitionAck, ApiError> {
        let url = self.endpoint(&["api", "jobs", job_id, "reject"])?;
        send_json(self.client.post(url).json(&RejectRequest { reason })).await
    }

    async fn mark_viewed(&self, job_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "jobs", job_id, "viewed"])?;
        send(self.client.post(url)).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}
