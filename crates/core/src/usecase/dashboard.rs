use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;

use crate::domain::error::{AppError, ErrorCode};
use crate::domain::job::{Filter, Job, JobPatch};
use crate::domain::projection::{project, AgeLevel, JobCard};
use crate::domain::repository::StatusCounts;
use crate::domain::settings::{DashboardConfig, Preferences};
use crate::domain::transition::{ActionState, PendingTransition, StatusTransition, TransitionRules};
use crate::infra::api::{HttpJobApi, JobApi};
use crate::infra::metrics::{Metrics, MetricsSummary};
use crate::infra::storage::{PreferenceBackend, SqlitePreferenceBackend};

use super::dashboard_state::StateHandle;
use super::preference_store::PreferenceStore;
use super::transition_engine::TransitionEngine;

/// 一覧再取得の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub total: usize,
    /// 前回の一覧になかった操作可能ジョブ（初回取得時は空）
    pub new_job_ids: Vec<String>,
    pub play_sound: bool,
    /// 再取得後も残っている進行中の遷移数
    pub pending_preserved: usize,
}

/// 描画層へ渡すビューのスナップショット
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub revision: u64,
    pub filter: Filter,
    pub jobs: Vec<JobCard>,
    pub tab_counts: StatusCounts,
    pub pending_transitions: Vec<PendingTransition>,
    pub last_error: Option<AppError>,
    pub sound_enabled: bool,
}

/// ダッシュボードコントローラー（描画層からのインテントを受け、ビュー状態を公開する）
pub struct DashboardController {
    state: Arc<StateHandle>,
    engine: TransitionEngine,
    api: Arc<dyn JobApi>,
    preferences: PreferenceStore,
    metrics: Arc<Metrics>,
}

impl DashboardController {
    /// 遷移ルールが不正なら Validation エラー
    pub fn new(
        api: Arc<dyn JobApi>,
        backend: Arc<dyn PreferenceBackend>,
        rules: TransitionRules,
    ) -> Result<Self, AppError> {
        rules.validate()?;
        let state = Arc::new(StateHandle::default());
        let metrics = Arc::new(Metrics::new());
        let engine = TransitionEngine::new(state.clone(), api.clone(), rules, metrics.clone());
        let preferences = PreferenceStore::load(backend);
        log::info!(
            "ダッシュボードを初期化: api={}, sound={}",
            api.name(),
            preferences.get().sound_enabled
        );

        Ok(Self {
            state,
            engine,
            api,
            preferences,
            metrics,
        })
    }

    /// 設定から HTTP API と SQLite 設定ストアを組み立てる
    pub fn from_config(config: &DashboardConfig) -> Result<Self, AppError> {
        config.validate()?;
        let api = HttpJobApi::from_config(config)
            .map_err(|e| AppError::validation(format!("API 設定が不正です: {e}")))?;
        let db_path = config.resolve_db_path();
        let backend = SqlitePreferenceBackend::open(&db_path)?;
        log::info!("設定DB: {}", db_path.display());

        Self::new(Arc::new(api), Arc::new(backend), config.rules)
    }

    // ==================== Filter / Preferences ====================

    pub fn select_filter(&self, filter: Filter) {
        self.state.update(|s| s.filter = filter);
        log::debug!("フィルタ変更: {filter}");
    }

    /// 通知音を切り替え、新しい値を返す
    pub fn toggle_sound(&self) -> bool {
        let enabled = self.preferences.toggle_sound();
        // 設定の変更も購読者へ通知する
        self.state.update(|_| ());
        enabled
    }

    pub fn set_preferences(&self, prefs: Preferences) {
        self.preferences.set(prefs);
        self.state.update(|_| ());
    }

    // ==================== Transitions ====================

    pub async fn approve(&self, job_id: &str) -> Result<StatusTransition, AppError> {
        self.approve_with_notes(job_id, None).await
    }

    /// 承認（スタッフのメモ付き）
    pub async fn approve_with_notes(
        &self,
        job_id: &str,
        notes: Option<&str>,
    ) -> Result<StatusTransition, AppError> {
        let result = self.engine.approve(job_id, notes).await;
        if let Err(e) = &result {
            self.record_failure(e);
        }
        result
    }

    pub async fn reject(&self, job_id: &str, reason: &str) -> Result<StatusTransition, AppError> {
        let result = self.engine.reject(job_id, reason).await;
        if let Err(e) = &result {
            self.record_failure(e);
        }
        result
    }

    /// 前提条件エラーを記録する。Transport は調停時に記録済み、Conflict は無視。
    fn record_failure(&self, error: &AppError) {
        match error.code {
            ErrorCode::Transport => {}
            ErrorCode::Conflict => {
                self.metrics.inc_error(error.code);
                log::debug!("処理中の操作と重複したため無視: {}", error.message);
            }
            code => {
                self.metrics.inc_error(code);
                log::warn!("操作を拒否: {}", error.message);
                let error = error.clone();
                self.state.update(|s| {
                    // 一覧にないジョブのカードは存在しない
                    if code != ErrorCode::NotFound {
                        if let Some(job_id) = &error.job_id {
                            s.failures.insert(job_id.clone(), error.clone());
                        }
                    }
                    s.last_error = Some(error);
                });
            }
        }
    }

    // ==================== Refresh ====================

    /// 全件を再取得して置き換える。進行中の遷移は保持する。
    pub async fn refresh(&self) -> Result<RefreshSummary, AppError> {
        let started = Instant::now();
        let page = match self.api.fetch_jobs(Filter::All).await {
            Ok(page) => page,
            Err(e) => {
                let error = AppError::transport(format!("ジョブ一覧の取得に失敗しました: {e}"));
                self.metrics.inc_error(error.code);
                log::warn!("{}", error.message);
                let recorded = error.clone();
                self.state.update(|s| s.last_error = Some(recorded));
                return Err(error);
            }
        };
        self.metrics
            .record_latency("fetch", started.elapsed().as_millis() as u64);
        self.metrics.inc_refreshes();

        let rules = self.engine.rules();
        let sound_enabled = self.preferences.get().sound_enabled;
        let summary = self.state.update(|s| {
            let first_load = !s.loaded;
            let known: HashSet<String> =
                s.repo.get_all().iter().map(|job| job.id.clone()).collect();

            s.repo.replace_all(page.jobs);
            s.loaded = true;
            let repo = &s.repo;
            s.failures.retain(|id, _| repo.get_by_id(id).is_some());

            let mut new_job_ids: Vec<String> = if first_load {
                vec![]
            } else {
                repo.get_all()
                    .into_iter()
                    .filter(|job| rules.is_actionable(job.status) && !known.contains(&job.id))
                    .map(|job| job.id.clone())
                    .collect()
            };
            new_job_ids.sort();

            RefreshSummary {
                total: repo.len(),
                play_sound: sound_enabled && !new_job_ids.is_empty(),
                new_job_ids,
                pending_preserved: s.pending.len(),
            }
        });

        log::info!(
            "一覧を再取得: {}件 (新規 {}件, 処理中 {}件)",
            summary.total,
            summary.new_job_ids.len(),
            summary.pending_preserved
        );
        Ok(summary)
    }

    // ==================== Review ====================

    /// スタッフ確認済みにする。API への通知は失敗してもログのみ。
    pub async fn mark_viewed(&self, job_id: &str) -> Result<(), AppError> {
        let now = Utc::now();
        let result = self.state.try_update(|s| {
            s.repo
                .patch(job_id, &JobPatch::staff_viewed(now), now)
                .map(|_| ())
        });
        if let Err(e) = result {
            self.record_failure(&e);
            return Err(e);
        }

        if let Err(e) = self.api.mark_viewed(job_id).await {
            log::warn!("確認済みの通知に失敗: job={job_id} {e}");
        }
        Ok(())
    }

    /// 直近のエラーとジョブ単位の失敗表示を消す
    pub fn clear_error(&self) {
        self.state.update(|s| {
            s.last_error = None;
            s.failures.clear();
        });
    }

    // ==================== View ====================

    pub fn filter(&self) -> Filter {
        self.state.read(|s| s.filter)
    }

    /// 現在のフィルタでの射影
    pub fn projected_jobs(&self) -> Vec<Job> {
        self.state
            .project(|_, s, projector| projector.projected_jobs(&s.repo, s.filter).to_vec())
    }

    pub fn projected_jobs_for(&self, filter: Filter) -> Vec<Job> {
        self.state.read(|s| project(&s.repo, filter))
    }

    pub fn tab_counts(&self) -> StatusCounts {
        self.state.read(|s| s.repo.counts_by_status())
    }

    pub fn pending_transitions(&self) -> Vec<PendingTransition> {
        self.state.read(|s| s.pending_transitions())
    }

    pub fn is_pending(&self, job_id: &str) -> bool {
        self.state.read(|s| s.pending.contains_key(job_id))
    }

    pub fn action_state(&self, job_id: &str) -> ActionState {
        self.state.read(|s| s.action_state(job_id))
    }

    pub fn last_error(&self) -> Option<AppError> {
        self.state.read(|s| s.last_error.clone())
    }

    pub fn sound_enabled(&self) -> bool {
        self.preferences.get().sound_enabled
    }

    pub fn preferences(&self) -> Preferences {
        self.preferences.get()
    }

    /// 一貫したビュー全体のスナップショット
    pub fn view(&self) -> DashboardView {
        let now = Utc::now();
        let rules = self.engine.rules();
        let sound_enabled = self.sound_enabled();

        self.state.project(|revision, s, projector| {
            let jobs = projector
                .projected_jobs(&s.repo, s.filter)
                .iter()
                .map(|job| JobCard {
                    age: AgeLevel::of(job, now),
                    actionable: rules.is_actionable(job.status)
                        && !s.pending.contains_key(&job.id),
                    action: s.action_state(&job.id),
                    job: job.clone(),
                })
                .collect();

            DashboardView {
                revision,
                filter: s.filter,
                jobs,
                tab_counts: projector.tab_counts(&s.repo),
                pending_transitions: s.pending_transitions(),
                last_error: s.last_error.clone(),
                sound_enabled,
            }
        })
    }

    /// 状態変更のたびにリビジョンが届く
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.state.subscribe()
    }

    pub fn metrics(&self) -> MetricsSummary {
        self.metrics.summary()
    }
}
