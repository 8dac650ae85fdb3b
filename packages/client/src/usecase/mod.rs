//! UseCase 層
//!
//! トランスポート・履歴ローダ・タイムラインをルーム単位の
//! attach/detach シーケンスに束ねます。

mod room_session;

pub use room_session::{
    DEFAULT_HISTORY_LIMIT, RoomSession, SendMessageError, SessionState,
};
