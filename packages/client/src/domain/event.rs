//! サーバ push イベントの論理表現
//!
//! ワイヤ上の表現（JSON フレーム、ドメインごとのイベント名）は
//! Infrastructure 層の DTO が担い、この層では正規化済みのイベントのみを
//! 扱います。

use crate::common::bus::Event;

use super::entity::ChatMessage;
use super::value_object::{MessageId, RoomId, UserId};

/// イベントカテゴリ（購読レジストリのキー）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Error,
    Joined,
    History,
    NewMessage,
    UserJoined,
    UserLeft,
    MessageRead,
}

/// サーバから push される正規化済みイベント
///
/// 共有接続には複数ルームのイベントが相乗りするため、ハンドラは自分の
/// ルーム ID と照合して無関係なイベントを黙って捨てる必要があります。
/// `MessageRead` はルーム ID を持たないので、タイムラインへの所属で
/// 代わりにフィルタします。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Error {
        message: String,
        code: Option<String>,
    },
    Joined {
        room_id: RoomId,
    },
    History {
        room_id: RoomId,
        messages: Vec<ChatMessage>,
    },
    NewMessage {
        room_id: RoomId,
        message: ChatMessage,
    },
    UserJoined {
        room_id: RoomId,
        user_id: UserId,
    },
    UserLeft {
        room_id: RoomId,
        user_id: UserId,
    },
    MessageRead {
        message_id: MessageId,
    },
}

impl ChatEvent {
    /// イベントが属するルーム ID（ルームに紐付かないイベントは None）
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            ChatEvent::Joined { room_id }
            | ChatEvent::History { room_id, .. }
            | ChatEvent::NewMessage { room_id, .. }
            | ChatEvent::UserJoined { room_id, .. }
            | ChatEvent::UserLeft { room_id, .. } => Some(room_id),
            ChatEvent::Error { .. } | ChatEvent::MessageRead { .. } => None,
        }
    }
}

impl Event for ChatEvent {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        match self {
            ChatEvent::Error { .. } => EventKind::Error,
            ChatEvent::Joined { .. } => EventKind::Joined,
            ChatEvent::History { .. } => EventKind::History,
            ChatEvent::NewMessage { .. } => EventKind::NewMessage,
            ChatEvent::UserJoined { .. } => EventKind::UserJoined,
            ChatEvent::UserLeft { .. } => EventKind::UserLeft,
            ChatEvent::MessageRead { .. } => EventKind::MessageRead,
        }
    }
}
