//! 統合テスト用のスクリプト化された JobApi
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};

use pd_core::domain::job::{Filter, Job, JobStatus};
use pd_core::infra::api::{ApiError, JobApi, JobPage, TransitionAck};

/// 記録された API 呼び出し
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub op: &'static str,
    pub job_id: Option<String>,
    pub body: Option<String>,
}

/// 保留中の呼び出しを解放するためのゲート
pub struct Gate {
    tx: oneshot::Sender<bool>,
}

impl Gate {
    pub fn succeed(self) {
        let _ = self.tx.send(true);
    }

    pub fn fail(self) {
        let _ = self.tx.send(false);
    }
}

#[derive(Default)]
struct Script {
    jobs: Vec<Job>,
    fail_fetch: bool,
    failing: HashSet<String>,
    gates: HashMap<String, oneshot::Receiver<bool>>,
    calls: Vec<Call>,
}

#[derive(Default)]
pub struct ScriptedApi {
    script: Mutex<Script>,
    called: Notify,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jobs(jobs: Vec<Job>) -> Self {
        let api = Self::new();
        api.set_jobs(jobs);
        api
    }

    /// 次回以降の fetch_jobs が返す一覧
    pub fn set_jobs(&self, jobs: Vec<Job>) {
        self.script.lock().jobs = jobs;
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.script.lock().fail_fetch = fail;
    }

    /// このジョブへの承認/却下を常に失敗させる
    pub fn fail_actions_for(&self, job_id: &str) {
        self.script.lock().failing.insert(job_id.to_string());
    }

    /// このジョブへの次の承認/却下をゲート解放まで保留する
    pub fn hold(&self, job_id: &str) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.script.lock().gates.insert(job_id.to_string(), rx);
        Gate { tx }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().calls.clone()
    }

    /// 指定ジョブへの承認/却下の呼び出し
    pub fn action_calls_for(&self, job_id: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.op != "fetch" && c.job_id.as_deref() == Some(job_id))
            .collect()
    }

    /// 承認/却下の呼び出しが累計 n 件に達するまで待つ
    pub async fn wait_for_actions(&self, n: usize) {
        let wait = async {
            loop {
                let actions = self
                    .script
                    .lock()
                    .calls
                    .iter()
                    .filter(|c| c.op == "approve" || c.op == "reject")
                    .count();
                if actions >= n {
                    return;
                }
                self.called.notified().await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("API が呼び出されなかった");
    }

    fn record(&self, op: &'static str, job_id: Option<&str>, body: Option<&str>) {
        self.script.lock().calls.push(Call {
            op,
            job_id: job_id.map(str::to_string),
            body: body.map(str::to_string),
        });
        self.called.notify_one();
    }

    async fn resolve(&self, job_id: &str) -> Result<TransitionAck, ApiError> {
        let (gate, failing) = {
            let mut script = self.script.lock();
            (script.gates.remove(job_id), script.failing.contains(job_id))
        };
        let succeed = match gate {
            Some(rx) => rx.await.unwrap_or(false),
            None => !failing,
        };
        if !succeed {
            return Err(ApiError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(TransitionAck {
            job_id: Some(job_id.to_string()),
            ..TransitionAck::ok()
        })
    }
}

#[async_trait]
impl JobApi for ScriptedApi {
    async fn fetch_jobs(&self, filter: Filter) -> Result<JobPage, ApiError> {
        self.record("fetch", None, Some(filter.as_str()));
        let script = self.script.lock();
        if script.fail_fetch {
            return Err(ApiError::Timeout);
        }
        let jobs: Vec<Job> = script
            .jobs
            .iter()
            .filter(|job| filter.matches(job.status))
            .cloned()
            .collect();
        Ok(JobPage {
            total: jobs.len(),
            jobs,
        })
    }

    async fn approve_job(
        &self,
        job_id: &str,
        notes: Option<&str>,
    ) -> Result<TransitionAck, ApiError> {
        self.record("approve", Some(job_id), notes);
        self.resolve(job_id).await
    }

    async fn reject_job(&self, job_id: &str, reason: &str) -> Result<TransitionAck, ApiError> {
        self.record("reject", Some(job_id), Some(reason));
        self.resolve(job_id).await
    }

    async fn mark_viewed(&self, job_id: &str) -> Result<(), ApiError> {
        self.record("viewed", Some(job_id), None);
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn at(s: &str) -> DateTime<Utc> {
    s.parse().expect("テスト用の日時")
}

pub fn job(id: &str, status: JobStatus, created_at: &str) -> Job {
    Job::new(id, format!("{id}.stl"), status, at(created_at))
}
