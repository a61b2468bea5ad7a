use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::AppError;
use super::transition::TransitionRules;

/// ユーザー設定（リロード後も保持される）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    /// 新着ジョブの通知音
    pub sound_enabled: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            sound_enabled: true,
        }
    }
}

pub const ENV_API_BASE_URL: &str = "PD_API_BASE_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "PD_REQUEST_TIMEOUT_SECS";
pub const ENV_ACTIONABLE_STATUS: &str = "PD_ACTIONABLE_STATUS";
pub const ENV_DB_PATH: &str = "PD_DB_PATH";

/// ダッシュボード設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardConfig {
    /// ジョブ API のベース URL
    pub api_base_url: String,
    /// API 呼び出しのタイムアウト（秒）
    pub request_timeout_secs: u64,
    pub rules: TransitionRules,
    /// 設定 DB のパス（None ならデータディレクトリ配下）
    pub db_path: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            request_timeout_secs: 10,
            rules: TransitionRules::default(),
            db_path: None,
        }
    }
}

impl DashboardConfig {
    /// 環境変数から読み込む（未設定の項目はデフォルト）
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_BASE_URL) {
            config.api_base_url = url;
        }
        if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            config.request_timeout_secs = secs.trim().parse().map_err(|e| {
                AppError::validation(format!("{ENV_REQUEST_TIMEOUT_SECS} が不正です: {e}"))
            })?;
        }
        if let Some(status) = lookup(ENV_ACTIONABLE_STATUS) {
            config.rules.actionable = status.parse()?;
        }
        if let Some(path) = lookup(ENV_DB_PATH) {
            config.db_path = Some(PathBuf::from(path));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.api_base_url.trim().is_empty() {
            return Err(AppError::validation("API のベース URL が空です"));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::validation("タイムアウトは1秒以上を指定してください"));
        }
        self.rules.validate()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 設定 DB のパスを解決する
    pub fn resolve_db_path(&self) -> PathBuf {
        if let Some(path) = &self.db_path {
            return path.clone();
        }
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("print-dashboard")
            .join("dashboard.db")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::domain::error::ErrorCode;
    use crate::domain::job::JobStatus;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = DashboardConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:3000");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.rules.actionable, JobStatus::Uploaded);
        assert!(config.db_path.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = DashboardConfig::from_lookup(lookup(&[
            (ENV_API_BASE_URL, "https://print.example.edu"),
            (ENV_REQUEST_TIMEOUT_SECS, "30"),
            (ENV_ACTIONABLE_STATUS, "pending"),
            (ENV_DB_PATH, "/tmp/pd.db"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "https://print.example.edu");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.rules.actionable, JobStatus::Pending);
        assert_eq!(config.resolve_db_path(), PathBuf::from("/tmp/pd.db"));
    }

    #[test]
    fn test_invalid_timeout() {
        let err = DashboardConfig::from_lookup(lookup(&[(ENV_REQUEST_TIMEOUT_SECS, "soon")]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);

        let err = DashboardConfig::from_lookup(lookup(&[(ENV_REQUEST_TIMEOUT_SECS, "0")]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
    }

    #[test]
    fn test_actionable_equal_to_target_is_rejected() {
        let err = DashboardConfig::from_lookup(lookup(&[(ENV_ACTIONABLE_STATUS, "REJECTED")]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
    }

    #[test]
    fn test_preferences_default_sound_on() {
        assert!(Preferences::default().sound_enabled);
    }

    #[test]
    fn test_default_db_path_file_name() {
        let path = DashboardConfig::default().resolve_db_path();
        assert!(path.ends_with("print-dashboard/dashboard.db"));
    }
}
