//! WebSocket セッションループ
//!
//! 接続→join 再送→フレームポンプ→切断検知→バックオフ→再接続、を
//! 無期限に繰り返すバックグラウンドタスク。コマンドチャンネルが閉じた
//! とき（`disconnect()`）だけループを抜けます。
//!
//! 接続失敗・切断はイベントバスの Error カテゴリに流します。タスク内で
//! panic する経路はありません。

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::common::bus::EventBus;
use crate::domain::{AuthToken, ChatEvent, ClientCommand, RoomId};
use crate::infrastructure::dto::websocket::{encode_command, parse_frame};

use super::socket::SocketConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

pub(super) struct SessionContext {
    pub config: SocketConfig,
    pub token: AuthToken,
    pub commands: mpsc::UnboundedReceiver<ClientCommand>,
    pub events: Arc<EventBus<ChatEvent>>,
    pub connected: Arc<AtomicBool>,
    pub joined_rooms: Arc<Mutex<HashSet<RoomId>>>,
}

/// ポンプの終了理由
enum PumpExit {
    /// 接続が失われた（再接続する）
    ConnectionLost,
    /// コマンドチャンネルが閉じた（`disconnect()`、ループ終了）
    Shutdown,
}

pub(super) async fn run_socket_session(mut ctx: SessionContext) {
    let url = format!("{}?token={}", ctx.config.url, ctx.token.as_str());
    let mut backoff = ctx.config.initial_backoff;

    loop {
        match connect_async(&url).await {
            Ok((stream, _response)) => {
                tracing::info!(
                    domain = ctx.config.domain.as_str(),
                    "chat socket connected"
                );
                ctx.connected.store(true, Ordering::SeqCst);
                backoff = ctx.config.initial_backoff;

                let (mut writer, mut reader) = stream.split();
                let exit = if replay_joins(&mut writer, &ctx).await {
                    pump(&mut writer, &mut reader, &mut ctx).await
                } else {
                    PumpExit::ConnectionLost
                };

                ctx.connected.store(false, Ordering::SeqCst);
                match exit {
                    PumpExit::Shutdown => return,
                    PumpExit::ConnectionLost => {
                        ctx.events.dispatch(&ChatEvent::Error {
                            message: "connection lost".to_string(),
                            code: None,
                        });
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    domain = ctx.config.domain.as_str(),
                    error = %e,
                    "chat socket connect failed"
                );
                ctx.events.dispatch(&ChatEvent::Error {
                    message: format!("connect failed: {e}"),
                    code: None,
                });
            }
        }

        tracing::info!(
            domain = ctx.config.domain.as_str(),
            backoff_ms = backoff.as_millis() as u64,
            "reconnecting"
        );
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(ctx.config.max_backoff);
    }
}

/// join 済みルームへの join を（再）送信する。失敗したら false。
async fn replay_joins(writer: &mut WsWriter, ctx: &SessionContext) -> bool {
    let rooms: Vec<RoomId> = ctx
        .joined_rooms
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .cloned()
        .collect();

    for room_id in rooms {
        let frame = encode_command(
            &ClientCommand::Join {
                room_id: room_id.clone(),
            },
            ctx.config.domain,
        );
        if let Err(e) = writer.send(Message::Text(frame.into())).await {
            tracing::warn!(
                room_id = room_id.as_str(),
                error = %e,
                "failed to replay join"
            );
            return false;
        }
        tracing::debug!(room_id = room_id.as_str(), "join replayed");
    }
    true
}

/// コマンド送信と受信フレーム配送を 1 つの select ループで回す
async fn pump(writer: &mut WsWriter, reader: &mut WsReader, ctx: &mut SessionContext) -> PumpExit {
    let domain = ctx.config.domain;
    let events = ctx.events.clone();

    loop {
        tokio::select! {
            command = ctx.commands.recv() => match command {
                Some(command) => {
                    let frame = encode_command(&command, domain);
                    if let Err(e) = writer.send(Message::Text(frame.into())).await {
                        tracing::warn!(error = %e, "failed to send command");
                        return PumpExit::ConnectionLost;
                    }
                }
                None => {
                    let _ = writer.close().await;
                    return PumpExit::Shutdown;
                }
            },
            incoming = reader.next() => match incoming {
                Some(Ok(Message::Text(text))) => dispatch_frame(&events, &text),
                Some(Ok(Message::Close(_))) => {
                    tracing::info!("server closed the connection");
                    return PumpExit::ConnectionLost;
                }
                // ping/pong は tungstenite が処理する。binary は来ない想定
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "websocket read error");
                    return PumpExit::ConnectionLost;
                }
                None => return PumpExit::ConnectionLost,
            },
        }
    }
}

/// 受信テキストフレームを正規化イベントとして配送する
///
/// パース・検証に失敗したフレームはログだけ残して捨てる（壊れたフレーム
/// 1 件でハンドラ側を巻き込まない）。
fn dispatch_frame(events: &EventBus<ChatEvent>, text: &str) {
    let event = parse_frame(text).and_then(ChatEvent::try_from);
    match event {
        Ok(event) => events.dispatch(&event),
        Err(e) => tracing::debug!(error = %e, "ignoring unrecognized frame"),
    }
}
