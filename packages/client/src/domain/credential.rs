//! Credential store trait 定義
//!
//! 永続ストレージ（ブラウザなら localStorage 相当）に保存された bearer
//! トークンへのインターフェース。トークンが無い場合、ルームアタッチメントは
//! 接続を試みません。

use super::value_object::AuthToken;

/// Bearer トークンの取得元
#[cfg_attr(test, mockall::automock)]
pub trait CredentialStore: Send + Sync {
    /// 現在のトークン（未ログインなら None）
    fn bearer_token(&self) -> Option<AuthToken>;
}
