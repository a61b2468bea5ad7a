mod http;
mod noop;

pub use http::HttpJobApi;
pub use noop::NoopJobApi;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::job::{Filter, Job};

/// ジョブ一覧レスポンス
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPage {
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub total: usize,
}

/// 承認/却下レスポンス
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionAck {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    /// サーバー側で確定した updated_at（任意）
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TransitionAck {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }
}

/// API 呼び出しエラー
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid API url: {0}")]
    InvalidUrl(String),
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Request timeout")]
    Timeout,
    #[error("Response parse error: {0}")]
    Decode(String),
    #[error("Server reported failure: {0}")]
    Unsuccessful(String),
}

/// ジョブ API trait（HTTP 実装やテスト用スタブが実装する）
#[async_trait]
pub trait JobApi: Send + Sync {
    async fn fetch_jobs(&self, filter: Filter) -> Result<JobPage, ApiError>;

    async fn approve_job(
        &self,
        job_id: &str,
        notes: Option<&str>,
    ) -> Result<TransitionAck, ApiError>;

    async fn reject_job(&self, job_id: &str, reason: &str) -> Result<TransitionAck, ApiError>;

    /// スタッフ確認済みの通知
    async fn mark_viewed(&self, job_id: &str) -> Result<(), ApiError>;

    fn name(&self) -> &str;
}
