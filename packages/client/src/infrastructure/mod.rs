//! Infrastructure 層
//!
//! ドメイン層が定義するインターフェースの具体実装（WebSocket トランス
//! ポート、REST 履歴ローダ、クレデンシャルストア）と、ワイヤ表現の DTO。

pub mod credential;
pub mod dto;
pub mod rest;
pub mod transport;

pub use credential::InMemoryCredentialStore;
pub use rest::RestHistoryLoader;
pub use transport::{ChatSocket, SocketConfig, shared_socket};
