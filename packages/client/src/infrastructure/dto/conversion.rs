//! Conversion logic between DTOs and domain models.
//!
//! ワイヤから来た値はすべて検証付きで変換します。検証を通らないフレームは
//! `ProtocolError` としてトランスポート層でログされ破棄され、ハンドラには
//! 届きません（壊れたフレーム 1 件で UI を落とさない）。

use crate::domain::{
    ChatEvent, ChatMessage, MessageId, MessageKind, ParticipantRole, RoomId, Sender, Timestamp,
    UserId, ValidationError,
};

use super::ProtocolError;
use super::websocket::{MessageDto, MessageKindDto, SenderDto, SenderRoleDto, ServerFrame};

// ========================================
// DTO → Domain Model
// ========================================

pub fn role_from_dto(role: SenderRoleDto) -> ParticipantRole {
    match role {
        SenderRoleDto::Student => ParticipantRole::Student,
        SenderRoleDto::Teacher => ParticipantRole::Teacher,
        SenderRoleDto::Staff => ParticipantRole::Staff,
        SenderRoleDto::Unknown => ParticipantRole::Unknown,
    }
}

pub fn kind_from_dto(kind: MessageKindDto) -> MessageKind {
    match kind {
        MessageKindDto::Text => MessageKind::Text,
        MessageKindDto::Image => MessageKind::Image,
        MessageKindDto::File => MessageKind::File,
    }
}

impl TryFrom<SenderDto> for Sender {
    type Error = ValidationError;

    fn try_from(dto: SenderDto) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::new(dto.id)?,
            name: dto.name,
            role: role_from_dto(dto.role),
        })
    }
}

impl TryFrom<MessageDto> for ChatMessage {
    type Error = ValidationError;

    fn try_from(dto: MessageDto) -> Result<Self, Self::Error> {
        let read_at = dto.read_at.map(Timestamp::new).transpose()?;
        Ok(Self {
            id: MessageId::new(dto.id)?,
            room_id: RoomId::new(dto.room_id)?,
            sender: dto.sender.try_into()?,
            body: dto.body,
            kind: kind_from_dto(dto.kind),
            file_url: dto.file_url,
            created_at: Timestamp::new(dto.created_at)?,
            read_at,
        })
    }
}

impl TryFrom<ServerFrame> for ChatEvent {
    type Error = ProtocolError;

    fn try_from(frame: ServerFrame) -> Result<Self, <Self as TryFrom<ServerFrame>>::Error> {
        let event = match frame {
            ServerFrame::Error {
                message,
                error_code,
            } => ChatEvent::Error {
                message,
                code: error_code,
            },
            ServerFrame::Joined { room_id } => ChatEvent::Joined {
                room_id: RoomId::new(room_id)?,
            },
            ServerFrame::History { room_id, messages } => ChatEvent::History {
                room_id: RoomId::new(room_id)?,
                messages: messages
                    .into_iter()
                    .map(ChatMessage::try_from)
                    .collect::<Result<Vec<_>, _>>()?,
            },
            ServerFrame::NewMessage { room_id, message } => ChatEvent::NewMessage {
                room_id: RoomId::new(room_id)?,
                message: message.try_into()?,
            },
            ServerFrame::UserJoined { room_id, user_id } => ChatEvent::UserJoined {
                room_id: RoomId::new(room_id)?,
                user_id: UserId::new(user_id)?,
            },
            ServerFrame::UserLeft { room_id, user_id } => ChatEvent::UserLeft {
                room_id: RoomId::new(room_id)?,
                user_id: UserId::new(user_id)?,
            },
            ServerFrame::MessageRead { message_id } => ChatEvent::MessageRead {
                message_id: MessageId::new(message_id)?,
            },
        };
        Ok(event)
    }
}

// ========================================
// Domain Model → DTO
// ========================================

pub fn role_to_dto(role: ParticipantRole) -> SenderRoleDto {
    match role {
        ParticipantRole::Student => SenderRoleDto::Student,
        ParticipantRole::Teacher => SenderRoleDto::Teacher,
        ParticipantRole::Staff => SenderRoleDto::Staff,
        ParticipantRole::Unknown => SenderRoleDto::Unknown,
    }
}

pub fn kind_to_dto(kind: MessageKind) -> MessageKindDto {
    match kind {
        MessageKind::Text => MessageKindDto::Text,
        MessageKind::Image => MessageKindDto::Image,
        MessageKind::File => MessageKindDto::File,
    }
}

impl From<ChatMessage> for MessageDto {
    fn from(model: ChatMessage) -> Self {
        Self {
            id: model.id.into_string(),
            room_id: model.room_id.into_string(),
            sender: SenderDto {
                id: model.sender.id.into_string(),
                name: model.sender.name,
                role: role_to_dto(model.sender.role),
            },
            body: model.body,
            kind: kind_to_dto(model.kind),
            file_url: model.file_url,
            created_at: model.created_at.into_string(),
            read_at: model.read_at.map(Timestamp::into_string),
        }
    }
}
