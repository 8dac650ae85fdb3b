//! ドメイン層のエラー型

use thiserror::Error;

/// 値オブジェクト生成時の検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Identifier is empty or whitespace-only
    #[error("identifier must not be empty")]
    EmptyId,

    /// Bearer token is empty
    #[error("bearer token must not be empty")]
    EmptyToken,

    /// Message body is empty
    #[error("message body must not be empty")]
    EmptyBody,

    /// Message body exceeds the maximum length
    #[error("message body exceeds {max} characters")]
    BodyTooLong { max: usize },

    /// Timestamp is not a valid RFC 3339 string
    #[error("invalid RFC 3339 timestamp: '{0}'")]
    InvalidTimestamp(String),
}
