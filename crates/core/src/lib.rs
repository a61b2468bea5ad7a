//! 印刷ジョブ審査ダッシュボードの状態コントローラー
//!
//! ジョブ一覧の保持、ステータス別の射影、承認/却下の楽観的更新と調停、
//! 設定の永続化を担う。描画層はインテントを送り、ビュー状態を購読する。

pub mod domain;
pub mod infra;
pub mod usecase;
