//! WebSocket トランスポート実装
//!
//! - `socket`: 接続マネージャ（`ChatTransport` 実装）
//! - `session`: 再接続ループとフレームポンプ

mod session;
mod socket;

use std::sync::{Arc, OnceLock};

use crate::domain::ChatDomain;

pub use socket::{ChatSocket, SocketConfig};

static BOOKING_SOCKET: OnceLock<Arc<ChatSocket>> = OnceLock::new();
static CONSULTATION_SOCKET: OnceLock<Arc<ChatSocket>> = OnceLock::new();

/// チャットドメインごとのプロセス共有ソケットを返す
///
/// 初回呼び出し時に渡された設定で遅延生成され、以後は同じインスタンスを
/// 返します（設定は無視される）。1 ドメイン 1 接続をアプリ全体で使い回す
/// ための単一のアクセサです。テストでは `ChatSocket::new` を直接使って
/// 注入してください。破棄はアプリケーションレベルのログアウトで
/// `disconnect()` を呼ぶだけで、インスタンス自体はプロセスと共に生きます。
pub fn shared_socket(config: SocketConfig) -> Arc<ChatSocket> {
    let cell = match config.domain {
        ChatDomain::Booking => &BOOKING_SOCKET,
        ChatDomain::Consultation => &CONSULTATION_SOCKET,
    };
    cell.get_or_init(|| Arc::new(ChatSocket::new(config))).clone()
}
