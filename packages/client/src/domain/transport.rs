//! Transport trait 定義
//!
//! ルームライフサイクル（UseCase 層）が必要とする接続操作のインターフェース。
//! 具体的な WebSocket 実装は Infrastructure 層が提供します（依存性の逆転）。

use std::sync::Arc;

use crate::common::bus::EventBus;

use super::entity::MessageKind;
use super::event::ChatEvent;
use super::value_object::{AuthToken, MessageBody, MessageId, RoomId};

/// チャットドメイン 1 つ分の共有接続
///
/// 実装はプロセス全体で 1 接続を多数のルームアタッチメントに使い回します。
/// 接続系の操作はすべて fire-and-emit で、完了を await しません。失敗は
/// イベントバスの Error カテゴリに流れ、同期的には決して投げられません。
pub trait ChatTransport: Send + Sync {
    /// 接続を開始する（既に接続中・再接続中なら何もしない）
    ///
    /// 以後は指数バックオフ付きで無期限に自動再接続します。
    fn connect(&self, token: AuthToken);

    /// 接続を切断し、登録済みハンドラを全消去する
    ///
    /// アプリケーションレベルのログアウト専用。ルームのアンマウントでは
    /// 呼びません。
    fn disconnect(&self);

    /// 現在接続が生きているか
    fn is_connected(&self) -> bool;

    /// ルームへの join を要求する（再接続後も自動で再 join される）
    fn join(&self, room_id: &RoomId);

    /// ルームからの leave を要求する（下層の接続は切らない）
    fn leave(&self, room_id: &RoomId);

    /// メッセージ送信を要求する
    ///
    /// クライアントから見れば fire-and-forget。正本はサーバ採番 ID 付きの
    /// new-message push として届くため、ローカルでの楽観的描画は行いません。
    fn send_message(
        &self,
        room_id: &RoomId,
        body: MessageBody,
        kind: MessageKind,
        file_url: Option<String>,
    );

    /// 既読レシートを送る
    ///
    /// 切断中は黙ってスキップされます（呼び出し側にエラーは返らない）。
    fn mark_read(&self, message_id: &MessageId);

    /// このトランスポートのイベント購読レジストリ
    fn events(&self) -> Arc<EventBus<ChatEvent>>;
}
