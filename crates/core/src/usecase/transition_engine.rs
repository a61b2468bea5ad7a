use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::domain::error::{AppError, ErrorCode};
use crate::domain::job::{JobPatch, JobStatus};
use crate::domain::repository::JobRepository;
use crate::domain::transition::{
    ActionKind, PendingTransition, StatusTransition, TransitionRules,
};
use crate::infra::api::{ApiError, JobApi, TransitionAck};
use crate::infra::metrics::Metrics;

use super::dashboard_state::StateHandle;

/// 遷移エンジン: 楽観的更新 → API 呼び出し → コミット/ロールバック
///
/// API 呼び出しと調停は Tokio タスク上で行うため、呼び出し側が待機をやめても
/// 進行中の遷移は必ず閉じられる。
#[derive(Clone)]
pub struct TransitionEngine {
    state: Arc<StateHandle>,
    api: Arc<dyn JobApi>,
    rules: TransitionRules,
    metrics: Arc<Metrics>,
}

impl TransitionEngine {
    pub fn new(
        state: Arc<StateHandle>,
        api: Arc<dyn JobApi>,
        rules: TransitionRules,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            state,
            api,
            rules,
            metrics,
        }
    }

    pub fn rules(&self) -> TransitionRules {
        self.rules
    }

    /// 承認。notes は空白のみなら送らない。
    pub async fn approve(
        &self,
        job_id: &str,
        notes: Option<&str>,
    ) -> Result<StatusTransition, AppError> {
        let pending = self.begin(job_id, ActionKind::Approve, None, Utc::now())?;
        let notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let api = self.api.clone();
        let id = job_id.to_string();
        let sent = notes.clone();
        self.dispatch(pending, notes, async move {
            api.approve_job(&id, sent.as_deref()).await
        })
        .await
    }

    /// 却下。理由は前後の空白を除いて送る。
    pub async fn reject(&self, job_id: &str, reason: &str) -> Result<StatusTransition, AppError> {
        let pending = self.begin(job_id, ActionKind::Reject, Some(reason), Utc::now())?;
        let reason = reason.trim().to_string();

        let api = self.api.clone();
        let id = job_id.to_string();
        self.dispatch(pending, None, async move { api.reject_job(&id, &reason).await })
            .await
    }

    /// 前提条件を検査し、楽観的に遷移先ステータスを適用する
    ///
    /// 検査順: 存在 → 進行中の遷移 → 操作可能ステータス → 却下理由。
    /// いずれかで失敗した場合は状態を一切変更しない。
    pub(crate) fn begin(
        &self,
        job_id: &str,
        kind: ActionKind,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<PendingTransition, AppError> {
        let rules = self.rules;
        let pending = self.state.try_update(|s| {
            let job = s
                .repo
                .get_by_id(job_id)
                .ok_or_else(|| AppError::not_found(job_id))?;

            if s.pending.contains_key(job_id) {
                return Err(AppError::conflict(job_id));
            }
            if !rules.is_actionable(job.status) {
                return Err(AppError::invalid_state(format!(
                    "ジョブ {job_id} は {} のため{}できません",
                    job.status,
                    label(kind)
                ))
                .with_job(job_id));
            }
            if kind == ActionKind::Reject && reason.map_or(true, |r| r.trim().is_empty()) {
                return Err(AppError::validation("却下理由を入力してください").with_job(job_id));
            }

            let mut pending = PendingTransition::new(
                job,
                kind,
                rules.target_for(kind),
                now,
                s.repo.refresh_generation(),
            );
            s.repo
                .patch(job_id, &JobPatch::status(pending.target_status), now)?;
            pending.applied_version = s.repo.version();
            s.failures.remove(job_id);
            s.pending.insert(job_id.to_string(), pending.clone());
            Ok(pending)
        })?;

        log::info!(
            "{}を受付: job={} {} -> {} (transition={})",
            label(kind),
            job_id,
            pending.previous_status,
            pending.target_status,
            pending.transition_id
        );
        Ok(pending)
    }

    async fn dispatch<F>(
        &self,
        pending: PendingTransition,
        notes: Option<String>,
        call: F,
    ) -> Result<StatusTransition, AppError>
    where
        F: Future<Output = Result<TransitionAck, ApiError>> + Send + 'static,
    {
        let state = self.state.clone();
        let metrics = self.metrics.clone();
        let fallback = pending.clone();
        let fallback_notes = notes.clone();

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let result = call.await.and_then(ensure_success);
            metrics.record_latency(pending.kind.as_str(), started.elapsed().as_millis() as u64);
            reconcile(&state, &metrics, &pending, notes.as_deref(), result, Utc::now())
        });

        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("遷移タスクが異常終了: job={} {e}", fallback.job_id);
                // 未調停のまま残さない（調停済みなら何もしない）
                reconcile(
                    &self.state,
                    &self.metrics,
                    &fallback,
                    fallback_notes.as_deref(),
                    Err(ApiError::Http(format!("transition task failed: {e}"))),
                    Utc::now(),
                )
            }
        }
    }
}

/// 調停: 結果に応じて進行中の遷移をコミットまたはロールバックする
///
/// transition_id 単位で冪等。既に閉じた遷移を再度調停すると Internal を返し、状態は変えない。
pub(crate) fn reconcile(
    state: &StateHandle,
    metrics: &Metrics,
    pending: &PendingTransition,
    notes: Option<&str>,
    result: Result<TransitionAck, ApiError>,
    now: DateTime<Utc>,
) -> Result<StatusTransition, AppError> {
    let job_id = pending.job_id.as_str();

    let outcome = state
        .try_update(|s| {
            let is_open = s
                .pending
                .get(job_id)
                .is_some_and(|open| open.transition_id == pending.transition_id);
            if !is_open {
                return Err(AppError::internal(format!(
                    "遷移 {} は既に調停済みです",
                    pending.transition_id
                ))
                .with_job(job_id));
            }
            s.pending.remove(job_id);
            let refreshed = s.repo.refresh_generation() != pending.refresh_generation;

            match result {
                Ok(ack) => {
                    let new_status = commit(&mut s.repo, pending, notes, &ack, refreshed, now);
                    Ok(Ok(StatusTransition {
                        job_id: job_id.to_string(),
                        kind: pending.kind,
                        prev_status: pending.previous_status,
                        new_status,
                    }))
                }
                Err(cause) => {
                    rollback(&mut s.repo, pending, refreshed, now);
                    let error = AppError::transport(format!(
                        "{}に失敗しました: {cause}",
                        label(pending.kind)
                    ))
                    .with_job(job_id);
                    s.failures.insert(job_id.to_string(), error.clone());
                    s.last_error = Some(error.clone());
                    Ok(Err(error))
                }
            }
        })
        .and_then(|settled| settled);

    match &outcome {
        Ok(transition) => {
            metrics.inc_committed(transition.kind);
            log::info!(
                "{}を確定: job={} {} -> {}",
                label(transition.kind),
                transition.job_id,
                transition.prev_status,
                transition.new_status
            );
        }
        Err(e) if e.code == ErrorCode::Transport => {
            metrics.inc_rollbacks();
            metrics.inc_error(e.code);
            log::warn!("ロールバック: job={} {}", job_id, e.message);
        }
        Err(e) => {
            log::error!("調停をスキップ: {}", e.message);
        }
    }
    outcome
}

/// サーバーが成功を返したときの確定処理。確定後のステータスを返す。
fn commit(
    repo: &mut JobRepository,
    pending: &PendingTransition,
    notes: Option<&str>,
    ack: &TransitionAck,
    refreshed: bool,
    now: DateTime<Utc>,
) -> JobStatus {
    let Some(current) = repo.get_by_id(&pending.job_id).map(|job| job.status) else {
        log::warn!(
            "ジョブ {} は再取得で一覧から消えたため、確定結果の反映をスキップします",
            pending.job_id
        );
        return pending.target_status;
    };

    let mut patch = JobPatch::default();
    // 遷移前のデータで置き換えられていた場合のみ遷移先を再適用する
    if refreshed && current == pending.previous_status {
        patch.status = Some(pending.target_status);
    }
    if let Some(notes) = notes {
        patch.notes = Some(Some(notes.to_string()));
    }
    patch.updated_at = ack.updated_at;

    if patch.is_empty() {
        return current;
    }
    match repo.patch(&pending.job_id, &patch, now) {
        Ok(job) => job.status,
        Err(e) => {
            log::warn!("確定結果の反映に失敗: {}", e.message);
            current
        }
    }
}

/// 失敗時の巻き戻し。再取得済みならサーバーの値を優先して何もしない。
///
/// 楽観的更新の後に他のパッチがなければ updated_at も遷移前に戻す。
/// 他のパッチがあれば updated_at は巻き戻さずに進める。
fn rollback(
    repo: &mut JobRepository,
    pending: &PendingTransition,
    refreshed: bool,
    now: DateTime<Utc>,
) {
    if refreshed {
        log::info!(
            "ジョブ {} は遷移中に再取得されたため、取得結果を維持します",
            pending.job_id
        );
        return;
    }
    let mut patch = JobPatch::status(pending.previous_status);
    if repo.version() == pending.applied_version {
        patch = patch.with_updated_at(pending.previous_updated_at);
    }
    if let Err(e) = repo.patch(&pending.job_id, &patch, now) {
        log::warn!("ロールバックの反映に失敗: {}", e.message);
    }
}

fn ensure_success(ack: TransitionAck) -> Result<TransitionAck, ApiError> {
    if ack.success {
        return Ok(ack);
    }
    Err(ApiError::Unsuccessful(
        ack.message
            .unwrap_or_else(|| "success=false".to_string()),
    ))
}

fn label(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::Approve => "承認",
        ActionKind::Reject => "却下",
    }
}
