use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AppError;

/// ジョブ状態
///
/// UPLOADED → PENDING → {READY_TO_PRINT | REJECTED} → PRINTING → COMPLETED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Uploaded,
    Pending,
    ReadyToPrint,
    Rejected,
    Printing,
    Completed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 6] = [
        JobStatus::Uploaded,
        JobStatus::Pending,
        JobStatus::ReadyToPrint,
        JobStatus::Rejected,
        JobStatus::Printing,
        JobStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "UPLOADED",
            Self::Pending => "PENDING",
            Self::ReadyToPrint => "READY_TO_PRINT",
            Self::Rejected => "REJECTED",
            Self::Printing => "PRINTING",
            Self::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| AppError::validation(format!("不明なジョブ状態です: {s}")))
    }
}

/// 印刷ジョブ（API から受け取る表示用レコード）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub student_email: String,
    #[serde(default)]
    pub discipline: String,
    #[serde(default)]
    pub class_number: String,
    #[serde(default)]
    pub original_filename: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub metadata_path: String,
    pub status: JobStatus,
    #[serde(default)]
    pub printer: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub weight_g: Option<f64>,
    #[serde(default)]
    pub time_hours: Option<f64>,
    #[serde(default)]
    pub cost_usd: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub staff_viewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Job {
    /// 必須フィールドだけを指定して生成する。メタデータは空。
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        status: JobStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            student_name: String::new(),
            student_email: String::new(),
            discipline: String::new(),
            class_number: String::new(),
            original_filename: String::new(),
            file_path: String::new(),
            metadata_path: String::new(),
            status,
            printer: None,
            color: None,
            material: None,
            weight_g: None,
            time_hours: None,
            cost_usd: None,
            created_at,
            updated_at: created_at,
            staff_viewed_at: None,
            notes: None,
        }
    }

    /// スタッフが未確認か
    pub fn is_unviewed(&self) -> bool {
        self.staff_viewed_at.is_none()
    }
}

/// ジョブの部分更新（浅いフィールド上書き）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub notes: Option<Option<String>>,
    pub staff_viewed_at: Option<Option<DateTime<Utc>>>,
    /// サーバーが返した updated_at。None ならパッチ時刻を使う。
    pub updated_at: Option<DateTime<Utc>>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn staff_viewed(at: DateTime<Utc>) -> Self {
        Self {
            staff_viewed_at: Some(Some(at)),
            ..Self::default()
        }
    }

    pub fn with_updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.notes.is_none()
            && self.staff_viewed_at.is_none()
            && self.updated_at.is_none()
    }
}

/// 一覧フィルタ（"all" またはステータス）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Filter {
    #[default]
    All,
    Status(JobStatus),
}

impl Filter {
    pub fn matches(&self, status: JobStatus) -> bool {
        match self {
            Self::All => true,
            Self::Status(s) => *s == status,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Status(s) => s.as_str(),
        }
    }
}

impl From<JobStatus> for Filter {
    fn from(status: JobStatus) -> Self {
        Self::Status(status)
    }
}

impl From<Filter> for String {
    fn from(filter: Filter) -> Self {
        filter.as_str().to_string()
    }
}

impl TryFrom<String> for Filter {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for Filter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse::<JobStatus>().map(Self::Status)
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
