//! クライアントからサーバへ送る論理コマンド
//!
//! ワイヤ上のイベント名はチャットドメインごとに異なるため、エンコードは
//! Infrastructure 層の DTO が行います。

use super::entity::MessageKind;
use super::value_object::{MessageBody, MessageId, RoomId};

/// 送信コマンド
///
/// いずれも fire-and-forget であり、結果はサーバ push イベントとして
/// 返ってきます（送信メッセージの正本も new-message echo で届く）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Join {
        room_id: RoomId,
    },
    Leave {
        room_id: RoomId,
    },
    SendMessage {
        room_id: RoomId,
        body: MessageBody,
        kind: MessageKind,
        file_url: Option<String>,
    },
    MarkRead {
        message_id: MessageId,
    },
}
