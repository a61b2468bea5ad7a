use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::settings::Preferences;
use crate::infra::storage::PreferenceBackend;

/// 設定ストア: 永続化先を包み、失敗してもメモリ上の値は保つ
pub struct PreferenceStore {
    backend: Arc<dyn PreferenceBackend>,
    current: Mutex<Preferences>,
}

impl PreferenceStore {
    /// 永続化先から読み込んで初期化する（欠損・破損時はデフォルト）
    pub fn load(backend: Arc<dyn PreferenceBackend>) -> Self {
        let current = read_or_default(backend.as_ref());
        Self {
            backend,
            current: Mutex::new(current),
        }
    }

    pub fn get(&self) -> Preferences {
        *self.current.lock()
    }

    /// メモリ上の値を更新してから書き込む。書き込み失敗はログのみ。
    pub fn set(&self, prefs: Preferences) {
        *self.current.lock() = prefs;
        self.persist(prefs);
    }

    /// 通知音を切り替え、新しい値を返す
    pub fn toggle_sound(&self) -> bool {
        let prefs = {
            let mut current = self.current.lock();
            current.sound_enabled = !current.sound_enabled;
            *current
        };
        self.persist(prefs);
        prefs.sound_enabled
    }

    fn persist(&self, prefs: Preferences) {
        let json = match serde_json::to_string(&prefs) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("設定のシリアライズに失敗: {e}");
                return;
            }
        };
        if let Err(e) = self.backend.write_preferences(&json) {
            log::warn!("設定の保存に失敗（メモリ上の値は維持）: {e}");
        }
    }
}

fn read_or_default(backend: &dyn PreferenceBackend) -> Preferences {
    match backend.read_preferences() {
        Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
            log::warn!("保存済み設定が破損しているためデフォルトを使用: {e}");
            Preferences::default()
        }),
        Ok(None) => Preferences::default(),
        Err(e) => {
            log::warn!("設定の読み込みに失敗したためデフォルトを使用: {e}");
            Preferences::default()
        }
    }
}
