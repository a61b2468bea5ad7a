use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::AppError;
use super::job::{Filter, Job, JobPatch, JobStatus};

/// ステータス別件数（タブ表示用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub all: usize,
    pub by_status: BTreeMap<JobStatus, usize>,
}

impl StatusCounts {
    fn empty() -> Self {
        Self {
            all: 0,
            by_status: JobStatus::ALL.into_iter().map(|s| (s, 0)).collect(),
        }
    }

    pub fn get(&self, filter: Filter) -> usize {
        match filter {
            Filter::All => self.all,
            Filter::Status(s) => self.by_status.get(&s).copied().unwrap_or(0),
        }
    }
}

/// ジョブリポジトリ（インメモリ、id をキーとする唯一の書き込み先）
#[derive(Debug, Default)]
pub struct JobRepository {
    jobs: HashMap<String, Job>,
    version: u64,
    refresh_generation: u64,
}

impl JobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全件置き換え（部分マージなし、重複 id は後勝ち）
    pub fn replace_all(&mut self, jobs: Vec<Job>) {
        let mut next = HashMap::with_capacity(jobs.len());
        for mut job in jobs {
            if job.updated_at < job.created_at {
                log::warn!(
                    "ジョブ {} の updated_at が created_at より前のため補正します",
                    job.id
                );
                job.updated_at = job.created_at;
            }
            next.insert(job.id.clone(), job);
        }
        self.jobs = next;
        self.version += 1;
        self.refresh_generation += 1;
    }

    pub fn get_all(&self) -> Vec<&Job> {
        self.jobs.values().collect()
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// 浅いフィールド更新。updated_at はパッチ時刻（またはサーバー値）に進める。
    pub fn patch(
        &mut self,
        id: &str,
        patch: &JobPatch,
        now: DateTime<Utc>,
    ) -> Result<&Job, AppError> {
        let job = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(id))?;

        if let Some(status) = patch.status {
            job.status = status;
        }
        if let Some(notes) = &patch.notes {
            job.notes = notes.clone();
        }
        if let Some(viewed) = patch.staff_viewed_at {
            job.staff_viewed_at = viewed;
        }
        // created_at より前には戻さない
        job.updated_at = patch.updated_at.unwrap_or(now).max(job.created_at);

        self.version += 1;
        Ok(job)
    }

    pub fn counts_by_status(&self) -> StatusCounts {
        let mut counts = StatusCounts::empty();
        for job in self.jobs.values() {
            *counts.by_status.entry(job.status).or_insert(0) += 1;
        }
        counts.all = self.jobs.len();
        counts
    }

    /// 変更ごとに増加するバージョン（メモ化キー）
    pub fn version(&self) -> u64 {
        self.version
    }

    /// replace_all ごとに増加する再取得世代
    pub fn refresh_generation(&self) -> u64 {
        self.refresh_generation
    }
}
