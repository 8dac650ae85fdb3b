//! WebSocket 接続マネージャ
//!
//! ## 責務
//!
//! - チャットドメイン 1 つにつき 1 本の接続をプロセス全体で維持する
//! - join 済みルームの集合を保持し、再接続のたびに join を再送する
//! - 送信コマンドのキューイング（切断中のコマンドは再接続後に流れる）
//!
//! ## 設計ノート
//!
//! 実際の接続・再接続・フレーム配送は `session` モジュールのバックグラウンド
//! タスクが行い、このマネージャは状態（キュー・join 集合・接続フラグ）の
//! 管理に徹します。非同期の失敗はすべてイベントバスの Error カテゴリに
//! 流れ、このマネージャのメソッドが同期的に失敗することはありません。

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::common::bus::EventBus;
use crate::domain::{
    AuthToken, ChatDomain, ChatEvent, ChatTransport, ClientCommand, MessageBody, MessageId,
    MessageKind, RoomId,
};

use super::session::{SessionContext, run_socket_session};

/// 接続設定
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// WebSocket エンドポイント（例: `ws://127.0.0.1:8080/chat`）
    pub url: String,
    pub domain: ChatDomain,
    /// 再接続バックオフの初期値
    pub initial_backoff: Duration,
    /// 再接続バックオフの上限
    pub max_backoff: Duration,
}

impl SocketConfig {
    pub fn new(url: impl Into<String>, domain: ChatDomain) -> Self {
        Self {
            url: url.into(),
            domain,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
        }
    }
}

struct SocketInner {
    command_tx: Option<mpsc::UnboundedSender<ClientCommand>>,
    session: Option<JoinHandle<()>>,
}

/// `ChatTransport` の WebSocket 実装
pub struct ChatSocket {
    config: SocketConfig,
    events: Arc<EventBus<ChatEvent>>,
    connected: Arc<AtomicBool>,
    joined_rooms: Arc<Mutex<HashSet<RoomId>>>,
    inner: Mutex<SocketInner>,
}

impl ChatSocket {
    pub fn new(config: SocketConfig) -> Self {
        Self {
            config,
            events: Arc::new(EventBus::new()),
            connected: Arc::new(AtomicBool::new(false)),
            joined_rooms: Arc::new(Mutex::new(HashSet::new())),
            inner: Mutex::new(SocketInner {
                command_tx: None,
                session: None,
            }),
        }
    }

    pub fn domain(&self) -> ChatDomain {
        self.config.domain
    }

    /// セッションタスクへコマンドを積む（タスク未起動時は破棄）
    fn command(&self, command: ClientCommand) {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match &inner.command_tx {
            Some(tx) => {
                // 受信側が生きている限り失敗しない。セッション終了直後の
                // 取りこぼしはログだけ残して握りつぶす
                if tx.send(command).is_err() {
                    tracing::debug!(
                        domain = self.config.domain.as_str(),
                        "session ended, dropping command"
                    );
                }
            }
            None => tracing::debug!(
                domain = self.config.domain.as_str(),
                "socket not started, dropping command"
            ),
        }
    }
}

impl ChatTransport for ChatSocket {
    fn connect(&self, token: AuthToken) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner
            .session
            .as_ref()
            .is_some_and(|session| !session.is_finished())
        {
            // 接続済み（または再接続試行中）なら何もしない
            return;
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        inner.command_tx = Some(command_tx);
        inner.session = Some(tokio::spawn(run_socket_session(SessionContext {
            config: self.config.clone(),
            token,
            commands: command_rx,
            events: self.events.clone(),
            connected: self.connected.clone(),
            joined_rooms: self.joined_rooms.clone(),
        })));
        tracing::info!(
            domain = self.config.domain.as_str(),
            url = %self.config.url,
            "chat socket starting"
        );
    }

    fn disconnect(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = inner.session.take() {
            session.abort();
        }
        inner.command_tx = None;
        self.connected.store(false, Ordering::SeqCst);
        self.joined_rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        // ルーム単位の後片付けとは違い、全ハンドラを一括で消す
        self.events.clear();
        tracing::info!(domain = self.config.domain.as_str(), "chat socket torn down");
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn join(&self, room_id: &RoomId) {
        self.joined_rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(room_id.clone());
        // 未接続分はセッション確立時の join 再送で賄われるため、
        // ここで emit するのは接続中のときだけ（二重 join を避ける）
        if self.is_connected() {
            self.command(ClientCommand::Join {
                room_id: room_id.clone(),
            });
        }
    }

    fn leave(&self, room_id: &RoomId) {
        self.joined_rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(room_id);
        if self.is_connected() {
            self.command(ClientCommand::Leave {
                room_id: room_id.clone(),
            });
        }
    }

    fn send_message(
        &self,
        room_id: &RoomId,
        body: MessageBody,
        kind: MessageKind,
        file_url: Option<String>,
    ) {
        // 切断中でもキューに積まれ、再接続後に流れる
        self.command(ClientCommand::SendMessage {
            room_id: room_id.clone(),
            body,
            kind,
            file_url,
        });
    }

    fn mark_read(&self, message_id: &MessageId) {
        if !self.is_connected() {
            tracing::debug!(
                message_id = message_id.as_str(),
                "socket offline, skipping read receipt"
            );
            return;
        }
        self.command(ClientCommand::MarkRead {
            message_id: message_id.clone(),
        });
    }

    fn events(&self) -> Arc<EventBus<ChatEvent>> {
        self.events.clone()
    }
}
