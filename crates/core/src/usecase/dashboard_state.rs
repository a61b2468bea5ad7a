use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::domain::error::AppError;
use crate::domain::job::Filter;
use crate::domain::projection::ViewProjector;
use crate::domain::repository::JobRepository;
use crate::domain::transition::{ActionState, PendingTransition};

/// ダッシュボード全体の状態（明示的に所有される単一の状態オブジェクト）
#[derive(Default)]
pub struct DashboardState {
    pub repo: JobRepository,
    /// jobId → 進行中の遷移（ジョブごとに高々1件）
    pub pending: HashMap<String, PendingTransition>,
    /// jobId → 直近の失敗（idle+error 表示用）
    pub failures: HashMap<String, AppError>,
    pub last_error: Option<AppError>,
    pub filter: Filter,
    /// 初回の一覧取得が済んだか
    pub loaded: bool,
}

impl DashboardState {
    pub fn action_state(&self, job_id: &str) -> ActionState {
        if let Some(pending) = self.pending.get(job_id) {
            return ActionState::Submitting { kind: pending.kind };
        }
        match self.failures.get(job_id) {
            Some(error) => ActionState::Failed {
                error: error.clone(),
            },
            None => ActionState::Idle,
        }
    }

    /// 提出時刻順の進行中遷移
    pub fn pending_transitions(&self) -> Vec<PendingTransition> {
        let mut pending: Vec<PendingTransition> = self.pending.values().cloned().collect();
        pending.sort_by(|a, b| {
            a.submitted_at
                .cmp(&b.submitted_at)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        pending
    }
}

/// 状態への共有ハンドル
///
/// 読み書きはすべてロック内のクロージャで行うため、適用途中のパッチが観測されることはない。
/// 変更のたびにリビジョンを watch チャネルへ通知する。
pub struct StateHandle {
    inner: Mutex<StateCell>,
    changes: watch::Sender<u64>,
}

struct StateCell {
    state: DashboardState,
    /// 射影キャッシュ（観測可能な状態ではないため変更通知の対象外）
    projector: ViewProjector,
    revision: u64,
}

impl StateHandle {
    pub fn new(state: DashboardState) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Mutex::new(StateCell {
                state,
                projector: ViewProjector::new(),
                revision: 0,
            }),
            changes,
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&DashboardState) -> R) -> R {
        let cell = self.inner.lock();
        f(&cell.state)
    }

    /// リビジョンと射影キャッシュ付きの読み取り（通知しない）
    pub fn project<R>(&self, f: impl FnOnce(u64, &DashboardState, &mut ViewProjector) -> R) -> R {
        let mut guard = self.inner.lock();
        let cell = &mut *guard;
        f(cell.revision, &cell.state, &mut cell.projector)
    }

    /// 常に変更を通知する更新
    pub fn update<R>(&self, f: impl FnOnce(&mut DashboardState) -> R) -> R {
        let mut cell = self.inner.lock();
        let result = f(&mut cell.state);
        cell.revision += 1;
        self.changes.send_replace(cell.revision);
        result
    }

    /// Ok のときだけ変更を通知する更新
    pub fn try_update<T, E>(
        &self,
        f: impl FnOnce(&mut DashboardState) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut cell = self.inner.lock();
        let result = f(&mut cell.state)?;
        cell.revision += 1;
        self.changes.send_replace(cell.revision);
        Ok(result)
    }

    pub fn revision(&self) -> u64 {
        self.inner.lock().revision
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

impl Default for StateHandle {
    fn default() -> Self {
        Self::new(DashboardState::default())
    }
}
