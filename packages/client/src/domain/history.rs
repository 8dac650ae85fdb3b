//! History loader trait 定義
//!
//! ルームの初期履歴を REST 経由で取得するインターフェース。socket の
//! history イベントと並走する冗長経路で、どちらが先に解決しても同じ
//! タイムラインに合流します。具体実装は Infrastructure 層（依存性の逆転）。

use async_trait::async_trait;
use thiserror::Error;

use super::entity::ChatMessage;
use super::value_object::RoomId;

/// 履歴取得時のエラー
///
/// どのエラーも致命的ではなく、「空のまま表示して socket 履歴を待つ」に
/// 縮退します。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// リクエスト自体の失敗（接続不可、非 2xx など）
    #[error("history request failed: {0}")]
    Request(String),

    /// レスポンスをドメインモデルに変換できない
    #[error("history response malformed: {0}")]
    Malformed(String),
}

/// ルーム履歴のローダ
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryLoader: Send + Sync {
    /// 直近 `limit` 件（上限 200）のメッセージを取得する
    async fn recent_messages(
        &self,
        room_id: &RoomId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, HistoryError>;
}
