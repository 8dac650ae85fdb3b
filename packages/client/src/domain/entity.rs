//! エンティティ定義

use super::value_object::{MessageId, RoomId, Timestamp, UserId};

/// 送信者のロール
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantRole {
    Student,
    Teacher,
    Staff,
    /// サーバが新しいロールを追加しても既存クライアントが壊れないための受け皿
    Unknown,
}

/// メッセージ種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Image,
    File,
}

/// 送信者のスナップショット
///
/// メッセージ作成時点のプロフィールの複製であり、ライブ参照ではありません。
/// 後からプロフィールが変更されても過去メッセージの表示は変わりません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: UserId,
    pub name: String,
    pub role: ParticipantRole,
}

/// チャットメッセージ
///
/// `id` はサーバ採番のグローバル一意文字列で、マージ・重複排除のキーです。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender: Sender,
    pub body: String,
    pub kind: MessageKind,
    pub file_url: Option<String>,
    pub created_at: Timestamp,
    /// 既読時刻（未読なら None）
    pub read_at: Option<Timestamp>,
}

impl ChatMessage {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    /// このメッセージが指定ユーザーの発言かどうか
    pub fn authored_by(&self, user_id: &UserId) -> bool {
        self.sender.id == *user_id
    }
}
