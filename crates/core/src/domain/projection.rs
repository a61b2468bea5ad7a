use chrono::{DateTime, Utc};
use serde::Serialize;

use super::job::{Filter, Job};
use super::repository::{JobRepository, StatusCounts};
use super::transition::ActionState;

/// 経過時間の目安（カードの色分け用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeLevel {
    /// 24時間未満
    Fresh,
    /// 72時間未満
    Aging,
    Stale,
}

impl AgeLevel {
    pub fn of(job: &Job, now: DateTime<Utc>) -> Self {
        let hours = (now - job.created_at).num_hours();
        if hours < 24 {
            Self::Fresh
        } else if hours < 72 {
            Self::Aging
        } else {
            Self::Stale
        }
    }
}

/// 一覧に表示するジョブカード
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCard {
    pub job: Job,
    pub age: AgeLevel,
    pub actionable: bool,
    pub action: ActionState,
}

struct CachedProjection {
    version: u64,
    filter: Filter,
    jobs: Vec<Job>,
}

/// ビュー射影。リポジトリを読むだけで変更しない。
///
/// (リポジトリ version, filter) が同じ間は前回の結果を再利用する。
#[derive(Default)]
pub struct ViewProjector {
    cache: Option<CachedProjection>,
}

impl ViewProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// フィルタに一致するジョブを created_at 降順（同時刻は id 昇順）で返す
    pub fn projected_jobs(&mut self, repo: &JobRepository, filter: Filter) -> &[Job] {
        let fresh = matches!(
            &self.cache,
            Some(c) if c.version == repo.version() && c.filter == filter
        );
        if !fresh {
            log::debug!("射影を再計算: filter={filter}, version={}", repo.version());
            self.cache = Some(CachedProjection {
                version: repo.version(),
                filter,
                jobs: project(repo, filter),
            });
        }
        match &self.cache {
            Some(cached) => &cached.jobs,
            None => &[],
        }
    }

    pub fn tab_counts(&self, repo: &JobRepository) -> StatusCounts {
        repo.counts_by_status()
    }
}

/// キャッシュを使わない純粋な射影
pub fn project(repo: &JobRepository, filter: Filter) -> Vec<Job> {
    let mut jobs: Vec<Job> = repo
        .get_all()
        .into_iter()
        .filter(|job| filter.matches(job.status))
        .cloned()
        .collect();
    jobs.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    jobs
}
