use async_trait::async_trait;

use super::{ApiError, JobApi, JobPage, TransitionAck};
use crate::domain::job::Filter;

/// NoopJobApi: 空の一覧を返し、承認/却下は常に成功するスタブ実装。
/// API サーバーなしでダッシュボードを起動する場合に使う。
pub struct NoopJobApi;

#[async_trait]
impl JobApi for NoopJobApi {
    async fn fetch_jobs(&self, _filter: Filter) -> Result<JobPage, ApiError> {
        Ok(JobPage {
            jobs: vec![],
            total: 0,
        })
    }

    async fn approve_job(
        &self,
        job_id: &str,
        _notes: Option<&str>,
    ) -> Result<TransitionAck, ApiError> {
        Ok(TransitionAck {
            job_id: Some(job_id.to_string()),
            ..TransitionAck::ok()
        })
    }

    async fn reject_job(&self, job_id: &str, _reason: &str) -> Result<TransitionAck, ApiError> {
        Ok(TransitionAck {
            job_id: Some(job_id.to_string()),
            ..TransitionAck::ok()
        })
    }

    async fn mark_viewed(&self, _job_id: &str) -> Result<(), ApiError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "noop"
    }
}
