//! 値オブジェクト定義
//!
//! 生の文字列をそのまま持ち回らず、生成時に検証された値オブジェクトとして
//! 扱います。不正な値はドメイン層に入った時点で弾かれます。

use std::fmt;

use super::error::ValidationError;

/// チャットドメイン（接続単位）
///
/// ドメインごとにプロセス全体で 1 本の WebSocket 接続を共有します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatDomain {
    /// 予約（booking）チャット
    Booking,
    /// 相談（consultation）チャット
    Consultation,
}

impl ChatDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatDomain::Booking => "booking",
            ChatDomain::Consultation => "consultation",
        }
    }
}

impl fmt::Display for ChatDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// 検証付きコンストラクタ（空文字列は不可）
            pub fn new(value: String) -> Result<Self, ValidationError> {
                if value.trim().is_empty() {
                    return Err(ValidationError::EmptyId);
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id! {
    /// ルーム ID（予約 ID または相談 ID）
    RoomId
}

string_id! {
    /// メッセージ ID（サーバ採番、マージのキー）
    MessageId
}

string_id! {
    /// ユーザー ID
    UserId
}

/// Bearer トークン
///
/// Display / Debug には値を出しません（ログへのトークン漏洩防止）。
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(value: String) -> Result<Self, ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::EmptyToken);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// メッセージ本文
///
/// 送信時の検証にのみ使用します。受信メッセージの本文は検証しません
/// （画像・ファイルメッセージは本文が空のことがある）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBody(String);

impl MessageBody {
    /// 本文の最大文字数
    pub const MAX_LEN: usize = 2000;

    pub fn new(value: String) -> Result<Self, ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::EmptyBody);
        }
        if value.chars().count() > Self::MAX_LEN {
            return Err(ValidationError::BodyTooLong { max: Self::MAX_LEN });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// メッセージのタイムスタンプ（RFC 3339 文字列）
///
/// フォーマットが固定されているため、文字列の辞書順比較が時系列比較と
/// 一致します。タイムラインのソートはこの性質に依存します。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(String);

impl Timestamp {
    /// 検証付きコンストラクタ（RFC 3339 としてパースできない文字列は不可）
    pub fn new(value: String) -> Result<Self, ValidationError> {
        if chrono::DateTime::parse_from_rfc3339(&value).is_err() {
            return Err(ValidationError::InvalidTimestamp(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
