//! Data Transfer Objects (DTOs) for the chat synchronization core.
//!
//! DTOs are organized by protocol:
//! - `websocket`: WebSocket frame DTOs and per-domain wire names
//! - `http`: REST API response DTOs

pub mod conversion;
pub mod http;
pub mod websocket;

use thiserror::Error;

use crate::domain::ValidationError;

/// ワイヤ表現からドメインモデルへの変換エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// JSON としてパースできない、または未知のフレーム
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// フィールドの値がドメインの検証を通らない
    #[error("invalid field in frame: {0}")]
    InvalidField(#[from] ValidationError),
}
