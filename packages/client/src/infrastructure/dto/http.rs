//! REST API レスポンスの DTO
//!
//! 履歴取得（`GET /rooms/{roomId}/messages?limit=N`）のみ。送信はどちらの
//! チャットドメインも socket 経路に統一したため、REST の送信エンドポイント
//! はこのクライアントでは使いません。

use serde::Deserialize;

use super::websocket::MessageDto;

/// 履歴取得レスポンス
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesResponse {
    pub messages: Vec<MessageDto>,
}
