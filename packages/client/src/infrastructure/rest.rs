//! REST 履歴ローダ実装
//!
//! socket の history イベントと並走する初期ロードの冗長経路。socket の
//! 認証や join が遅いときでも REST 側が先に解決すれば表示できます。
//! どちらが先でも同じタイムラインにマージされるため競争は無害です。

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{ChatMessage, CredentialStore, HistoryError, HistoryLoader, RoomId};

use super::dto::http::MessagesResponse;

/// 1 リクエストで取得できる履歴の上限件数
pub const MAX_HISTORY_LIMIT: usize = 200;

/// reqwest ベースの `HistoryLoader` 実装
pub struct RestHistoryLoader {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl RestHistoryLoader {
    /// # Arguments
    ///
    /// * `base_url` - REST API のベース URL（例: `http://127.0.0.1:8080/api`）
    /// * `credentials` - Bearer トークンの取得元（リクエストごとに読む）
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialStore>) -> Self {
        let base_url = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }
}

#[async_trait]
impl HistoryLoader for RestHistoryLoader {
    async fn recent_messages(
        &self,
        room_id: &RoomId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, HistoryError> {
        let limit = limit.min(MAX_HISTORY_LIMIT);
        let url = format!("{}/rooms/{}/messages", self.base_url, room_id.as_str());

        let mut request = self.http.get(&url).query(&[("limit", limit)]);
        if let Some(token) = self.credentials.bearer_token() {
            request = request.bearer_auth(token.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| HistoryError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| HistoryError::Request(e.to_string()))?;

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| HistoryError::Malformed(e.to_string()))?;

        body.messages
            .into_iter()
            .map(|dto| {
                ChatMessage::try_from(dto).map_err(|e| HistoryError::Malformed(e.to_string()))
            })
            .collect()
    }
}
