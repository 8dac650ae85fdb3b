//! クレデンシャルストア実装
//!
//! ブラウザ版では localStorage に相当する永続ストレージの読み出し。
//! この実装はプロセス内メモリに持つだけで、ログイン・ログアウトで
//! 差し替えられます。

use std::sync::{Mutex, PoisonError};

use crate::domain::{AuthToken, CredentialStore};

/// インメモリの `CredentialStore` 実装
#[derive(Default)]
pub struct InMemoryCredentialStore {
    token: Mutex<Option<AuthToken>>,
}

impl InMemoryCredentialStore {
    /// トークン無し（未ログイン状態）で作る
    pub fn new() -> Self {
        Self::default()
    }

    /// トークン入りで作る
    pub fn with_token(token: AuthToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }

    /// ログイン時にトークンを差し込む
    pub fn set_token(&self, token: AuthToken) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    /// ログアウト時にトークンを消す
    pub fn clear(&self) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn bearer_token(&self) -> Option<AuthToken> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
