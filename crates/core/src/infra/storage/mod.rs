mod preferences;

pub use preferences::{
    MemoryPreferenceBackend, PreferenceBackend, SqlitePreferenceBackend, PREFERENCES_KEY,
};

use crate::domain::error::AppError;

/// 永続ストレージのエラー
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Storage directory unavailable: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        AppError::storage(e.to_string())
    }
}
