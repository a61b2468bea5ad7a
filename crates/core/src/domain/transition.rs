use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AppError;
use super::job::{Job, JobStatus};

/// スタッフ操作の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Approve,
    Reject,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

/// 遷移ルール: 操作可能なステータスと各操作の遷移先
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRules {
    pub actionable: JobStatus,
    pub approve_target: JobStatus,
    pub reject_target: JobStatus,
}

impl TransitionRules {
    pub fn is_actionable(&self, status: JobStatus) -> bool {
        status == self.actionable
    }

    pub fn target_for(&self, kind: ActionKind) -> JobStatus {
        match kind {
            ActionKind::Approve => self.approve_target,
            ActionKind::Reject => self.reject_target,
        }
    }

    /// 3つのステータスが互いに異なることを検証する
    pub fn validate(&self) -> Result<(), AppError> {
        if self.actionable == self.approve_target
            || self.actionable == self.reject_target
            || self.approve_target == self.reject_target
        {
            return Err(AppError::validation(format!(
                "遷移ルールが不正です: actionable={}, approve={}, reject={}",
                self.actionable, self.approve_target, self.reject_target
            )));
        }
        Ok(())
    }
}

impl Default for TransitionRules {
    fn default() -> Self {
        Self {
            actionable: JobStatus::Uploaded,
            approve_target: JobStatus::ReadyToPrint,
            reject_target: JobStatus::Rejected,
        }
    }
}

/// 進行中の遷移（楽観的更新のスナップショット）
///
/// ジョブごとに高々1件。コミットまたはロールバックで破棄される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransition {
    pub transition_id: String,
    pub job_id: String,
    pub kind: ActionKind,
    pub previous_status: JobStatus,
    pub target_status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    /// ロールバック用に保持する遷移前の updated_at
    #[serde(skip)]
    pub previous_updated_at: DateTime<Utc>,
    /// 開始時点のリポジトリ再取得世代
    #[serde(skip)]
    pub refresh_generation: u64,
    /// 楽観的更新を適用した直後のリポジトリ version
    #[serde(skip)]
    pub applied_version: u64,
}

impl PendingTransition {
    /// 現在のジョブからスナップショットを取る。以後スナップショットは変更しない。
    pub fn new(
        job: &Job,
        kind: ActionKind,
        target_status: JobStatus,
        submitted_at: DateTime<Utc>,
        refresh_generation: u64,
    ) -> Self {
        Self {
            transition_id: uuid::Uuid::new_v4().to_string(),
            job_id: job.id.clone(),
            kind,
            previous_status: job.status,
            target_status,
            submitted_at,
            previous_updated_at: job.updated_at,
            refresh_generation,
            applied_version: 0,
        }
    }
}

/// ジョブ単位の操作ボタン状態
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ActionState {
    Idle,
    Submitting { kind: ActionKind },
    Failed { error: AppError },
}

/// 調停済み遷移の結果ペイロード
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTransition {
    pub job_id: String,
    pub kind: ActionKind,
    pub prev_status: JobStatus,
    pub new_status: JobStatus,
}
