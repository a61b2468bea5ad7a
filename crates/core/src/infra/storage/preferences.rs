use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::StorageError;

/// 設定 JSON を保存するキー
pub const PREFERENCES_KEY: &str = "dashboard_preferences";

/// 設定の永続化先 trait（文字列を読み書きするだけのキーバリュー）
pub trait PreferenceBackend: Send + Sync {
    fn read_preferences(&self) -> Result<Option<String>, StorageError>;
    fn write_preferences(&self, json: &str) -> Result<(), StorageError>;
}

/// SQLite の settings テーブルに保存するバックエンド
pub struct SqlitePreferenceBackend {
    conn: Mutex<Connection>,
}

impl SqlitePreferenceBackend {
    /// 新規接続（ファイルパス指定、親ディレクトリは作成する）
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// in-memory DB（テスト用）
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS settings (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl PreferenceBackend for SqlitePreferenceBackend {
    fn read_preferences(&self) -> Result<Option<String>, StorageError> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![PREFERENCES_KEY],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write_preferences(&self, json: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![PREFERENCES_KEY, json],
        )?;
        Ok(())
    }
}

/// メモリ上に保持するバックエンド（テスト、永続化不要な起動用）
#[derive(Default)]
pub struct MemoryPreferenceBackend {
    value: Mutex<Option<String>>,
    fail_writes: bool,
}

impl MemoryPreferenceBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(json: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(json.into())),
            fail_writes: false,
        }
    }

    /// 書き込みが常に失敗するバックエンド
    pub fn failing_writes() -> Self {
        Self {
            value: Mutex::new(None),
            fail_writes: true,
        }
    }

    pub fn stored(&self) -> Option<String> {
        self.value.lock().clone()
    }
}

impl PreferenceBackend for MemoryPreferenceBackend {
    fn read_preferences(&self) -> Result<Option<String>, StorageError> {
        Ok(self.value.lock().clone())
    }

    fn write_preferences(&self, json: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Unavailable("書き込みが無効化されています".to_string()));
        }
        *self.value.lock() = Some(json.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_empty_returns_none() {
        let backend = SqlitePreferenceBackend::open_in_memory().unwrap();
        assert!(backend.read_preferences().unwrap().is_none());
    }

    #[test]
    fn test_sqlite_write_and_overwrite() {
        let backend = SqlitePreferenceBackend::open_in_memory().unwrap();
        backend.write_preferences("{\"soundEnabled\":false}").unwrap();
        backend.write_preferences("{\"soundEnabled\":true}").unwrap();
        assert_eq!(
            backend.read_preferences().unwrap().as_deref(),
            Some("{\"soundEnabled\":true}")
        );
    }

    #[test]
    fn test_sqlite_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("pd-prefs-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("dashboard.db");

        {
            let backend = SqlitePreferenceBackend::open(&path).unwrap();
            backend.write_preferences("{\"soundEnabled\":false}").unwrap();
        }

        let reopened = SqlitePreferenceBackend::open(&path).unwrap();
        assert_eq!(
            reopened.read_preferences().unwrap().as_deref(),
            Some("{\"soundEnabled\":false}")
        );

        drop(reopened);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_memory_backend() {
        let backend = MemoryPreferenceBackend::new();
        assert!(backend.read_preferences().unwrap().is_none());
        backend.write_preferences("{}").unwrap();
        assert_eq!(backend.stored().as_deref(), Some("{}"));
    }

    #[test]
    fn test_memory_backend_failing_writes() {
        let backend = MemoryPreferenceBackend::failing_writes();
        assert!(backend.write_preferences("{}").is_err());
        assert!(backend.stored().is_none());
    }
}
