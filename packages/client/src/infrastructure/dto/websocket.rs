//! WebSocket フレームの DTO とドメイン別ワイヤ名
//!
//! ## ワイヤプロトコル
//!
//! フレームは `type` タグ付きの JSON オブジェクト、フィールド名は
//! camelCase（接続先が JS 系 API のため）。
//!
//! - 受信フレームのタグは両チャットドメインで共通
//!   （`history`, `new-message`, `message-read`, ...）
//! - 送信コマンドのタグだけがドメインごとに異なる
//!   （`join-booking-chat` / `join-consultation` など）。論理コマンドは
//!   共通で、ここのワイヤ名テーブルだけが差分を吸収します。

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{ChatDomain, ClientCommand};

use super::ProtocolError;
use super::conversion::kind_to_dto;

/// ドメインごとの送信コマンドのワイヤ名
#[derive(Debug, Clone, Copy)]
pub struct WireNames {
    pub join: &'static str,
    pub leave: &'static str,
    pub send_message: &'static str,
    pub mark_read: &'static str,
}

const BOOKING_WIRE: WireNames = WireNames {
    join: "join-booking-chat",
    leave: "leave-booking-chat",
    send_message: "booking-send-message",
    mark_read: "booking-mark-read",
};

const CONSULTATION_WIRE: WireNames = WireNames {
    join: "join-consultation",
    leave: "leave-consultation",
    send_message: "send-message",
    mark_read: "mark-read",
};

pub fn wire_names(domain: ChatDomain) -> &'static WireNames {
    match domain {
        ChatDomain::Booking => &BOOKING_WIRE,
        ChatDomain::Consultation => &CONSULTATION_WIRE,
    }
}

/// 送信者スナップショットの DTO
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: SenderRoleDto,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRoleDto {
    Student,
    Teacher,
    Staff,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKindDto {
    Text,
    Image,
    File,
}

/// チャットメッセージの DTO
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: String,
    pub room_id: String,
    pub sender: SenderDto,
    #[serde(default)]
    pub body: String,
    pub kind: MessageKindDto,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub read_at: Option<String>,
}

/// サーバからの受信フレーム
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    Error {
        message: String,
        #[serde(default)]
        error_code: Option<String>,
    },
    Joined {
        room_id: String,
    },
    History {
        room_id: String,
        messages: Vec<MessageDto>,
    },
    NewMessage {
        room_id: String,
        message: MessageDto,
    },
    UserJoined {
        room_id: String,
        user_id: String,
    },
    UserLeft {
        room_id: String,
        user_id: String,
    },
    MessageRead {
        message_id: String,
    },
}

/// 受信テキストフレームをパースする
pub fn parse_frame(text: &str) -> Result<ServerFrame, ProtocolError> {
    serde_json::from_str(text).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))
}

/// 論理コマンドをドメイン別ワイヤ名でエンコードする
pub fn encode_command(command: &ClientCommand, domain: ChatDomain) -> String {
    let names = wire_names(domain);
    let value = match command {
        ClientCommand::Join { room_id } => json!({
            "type": names.join,
            "roomId": room_id.as_str(),
        }),
        ClientCommand::Leave { room_id } => json!({
            "type": names.leave,
            "roomId": room_id.as_str(),
        }),
        ClientCommand::SendMessage {
            room_id,
            body,
            kind,
            file_url,
        } => json!({
            "type": names.send_message,
            "roomId": room_id.as_str(),
            "body": body.as_str(),
            "kind": kind_to_dto(*kind),
            "fileUrl": file_url,
        }),
        ClientCommand::MarkRead { message_id } => json!({
            "type": names.mark_read,
            "messageId": message_id.as_str(),
        }),
    };
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageBody, MessageId, MessageKind, RoomId};

    #[test]
    fn test_parse_history_frame() {
        // テスト項目: history フレームが room_id とメッセージリストにパースされる
        // given (前提条件):
        let text = r#"{
            "type": "history",
            "roomId": "booking-42",
            "messages": [{
                "id": "m1",
                "roomId": "booking-42",
                "sender": {"id": "u1", "name": "Alice", "role": "student"},
                "body": "hello",
                "kind": "text",
                "createdAt": "2024-03-01T10:00:00.000Z",
                "readAt": null
            }]
        }"#;

        // when (操作):
        let frame = parse_frame(text).unwrap();

        // then (期待する結果):
        match frame {
            ServerFrame::History { room_id, messages } => {
                assert_eq!(room_id, "booking-42");
                assert_eq!(messages.len(), 1);
                assert_eq!(messages[0].id, "m1");
                assert_eq!(messages[0].sender.role, SenderRoleDto::Student);
                assert_eq!(messages[0].read_at, None);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_parse_new_message_frame_with_file() {
        // テスト項目: ファイル添付付きの new-message フレームがパースされる
        // given (前提条件):
        let text = r#"{
            "type": "new-message",
            "roomId": "consult-7",
            "message": {
                "id": "m9",
                "roomId": "consult-7",
                "sender": {"id": "u2", "name": "Bob", "role": "teacher"},
                "body": "",
                "kind": "file",
                "fileUrl": "https://files.example.com/doc.pdf",
                "createdAt": "2024-03-01T10:00:00.000Z"
            }
        }"#;

        // when (操作):
        let frame = parse_frame(text).unwrap();

        // then (期待する結果):
        match frame {
            ServerFrame::NewMessage { room_id, message } => {
                assert_eq!(room_id, "consult-7");
                assert_eq!(message.kind, MessageKindDto::File);
                assert_eq!(
                    message.file_url.as_deref(),
                    Some("https://files.example.com/doc.pdf")
                );
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_frame_without_code() {
        // テスト項目: errorCode 省略時も error フレームがパースされる
        // given (前提条件):
        let text = r#"{"type": "error", "message": "unauthorized"}"#;

        // when (操作):
        let frame = parse_frame(text).unwrap();

        // then (期待する結果):
        assert_eq!(
            frame,
            ServerFrame::Error {
                message: "unauthorized".to_string(),
                error_code: None,
            }
        );
    }

    #[test]
    fn test_parse_unknown_role_falls_back() {
        // テスト項目: 未知のロール文字列は Unknown に落ちる（前方互換）
        // given (前提条件):
        let text = r#"{
            "type": "message-read",
            "messageId": "m1"
        }"#;
        let sender = r#"{"id": "u1", "name": "Robo", "role": "moderator"}"#;

        // when (操作):
        let frame = parse_frame(text).unwrap();
        let sender: SenderDto = serde_json::from_str(sender).unwrap();

        // then (期待する結果):
        assert_eq!(
            frame,
            ServerFrame::MessageRead {
                message_id: "m1".to_string(),
            }
        );
        assert_eq!(sender.role, SenderRoleDto::Unknown);
    }

    #[test]
    fn test_parse_rejects_unknown_frame() {
        // テスト項目: 未知の type タグはエラーになる（呼び出し側で破棄）
        // given (前提条件):
        let text = r#"{"type": "typing-indicator", "roomId": "booking-42"}"#;

        // when (操作):
        let result = parse_frame(text);

        // then (期待する結果):
        assert!(matches!(result, Err(ProtocolError::MalformedFrame(_))));
    }

    #[test]
    fn test_encode_join_uses_booking_wire_name() {
        // テスト項目: booking ドメインの join がドメイン固有タグでエンコードされる
        // given (前提条件):
        let command = ClientCommand::Join {
            room_id: RoomId::new("booking-42".to_string()).unwrap(),
        };

        // when (操作):
        let frame = encode_command(&command, ChatDomain::Booking);
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();

        // then (期待する結果):
        assert_eq!(value["type"], "join-booking-chat");
        assert_eq!(value["roomId"], "booking-42");
    }

    #[test]
    fn test_encode_send_message_uses_consultation_wire_name() {
        // テスト項目: consultation ドメインの送信コマンドのタグとペイロード
        // given (前提条件):
        let command = ClientCommand::SendMessage {
            room_id: RoomId::new("consult-7".to_string()).unwrap(),
            body: MessageBody::new("hello".to_string()).unwrap(),
            kind: MessageKind::Text,
            file_url: None,
        };

        // when (操作):
        let frame = encode_command(&command, ChatDomain::Consultation);
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();

        // then (期待する結果):
        assert_eq!(value["type"], "send-message");
        assert_eq!(value["roomId"], "consult-7");
        assert_eq!(value["body"], "hello");
        assert_eq!(value["kind"], "text");
        assert!(value["fileUrl"].is_null());
    }

    #[test]
    fn test_encode_mark_read_per_domain() {
        // テスト項目: mark-read のタグがドメインごとに切り替わる
        // given (前提条件):
        let command = ClientCommand::MarkRead {
            message_id: MessageId::new("m5".to_string()).unwrap(),
        };

        // when (操作):
        let booking: serde_json::Value =
            serde_json::from_str(&encode_command(&command, ChatDomain::Booking)).unwrap();
        let consultation: serde_json::Value =
            serde_json::from_str(&encode_command(&command, ChatDomain::Consultation)).unwrap();

        // then (期待する結果):
        assert_eq!(booking["type"], "booking-mark-read");
        assert_eq!(consultation["type"], "mark-read");
        assert_eq!(booking["messageId"], "m5");
    }
}
