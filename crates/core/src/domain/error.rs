use serde::Serialize;

/// アプリケーション共通エラーコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "E_NOT_FOUND")]
    NotFound,
    #[serde(rename = "E_INVALID_STATE")]
    InvalidState,
    #[serde(rename = "E_CONFLICT")]
    Conflict,
    #[serde(rename = "E_VALIDATION")]
    Validation,
    #[serde(rename = "E_TRANSPORT")]
    Transport,
    #[serde(rename = "E_STORAGE")]
    Storage,
    #[serde(rename = "E_INTERNAL")]
    Internal,
}

/// アプリケーションエラー（UI へのペイロード兼用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl AppError {
    fn new(code: ErrorCode, message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            code,
            message: message.into(),
            recoverable,
            job_id: None,
        }
    }

    pub fn not_found(job_id: &str) -> Self {
        Self::new(
            ErrorCode::NotFound,
            format!("ジョブ {job_id} が見つかりません"),
            false,
        )
        .with_job(job_id)
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, msg, false)
    }

    pub fn conflict(job_id: &str) -> Self {
        Self::new(
            ErrorCode::Conflict,
            format!("ジョブ {job_id} は処理中です"),
            false,
        )
        .with_job(job_id)
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, msg, true)
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Transport, msg, true)
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Storage, msg, false)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg, false)
    }

    /// 対象ジョブを付与する
    pub fn with_job(mut self, job_id: &str) -> Self {
        self.job_id = Some(job_id.to_string());
        self
    }

    /// 表示が古い可能性があり、再取得を促すべきエラーか
    pub fn refresh_suggested(&self) -> bool {
        matches!(self.code, ErrorCode::NotFound | ErrorCode::InvalidState)
    }

    /// 再試行で回復し得るか
    pub fn is_retryable(&self) -> bool {
        self.code == ErrorCode::Transport
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.job_id {
            Some(job_id) => write!(f, "[{:?}] {} (job: {job_id})", self.code, self.message),
            None => write!(f, "[{:?}] {}", self.code, self.message),
        }
    }
}

impl std::error::Error for AppError {}
