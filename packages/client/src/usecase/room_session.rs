//! UseCase: ルームライフサイクルの調停
//!
//! UI サーフェス 1 つがルーム 1 つに張り付いている間の一連の流れを司ります。
//!
//! ## 状態遷移（アタッチメント単位）
//!
//! - Idle → (attach) → Connecting: 接続 + join + REST 履歴ロード開始
//! - Connecting → (socket history 受信 または REST ロード解決) → Ready
//! - Ready → (new-message / message-read) → Ready（マージのみ）
//! - 任意の状態 → (detach) → Idle: leave 送信、自分のハンドラだけ解除。
//!   共有接続はそのまま
//! - エラーイベントは記録されるだけで状態を変えない（一時的なエラーが
//!   解消すれば続けて送信できる）
//!
//! ## 初期ロードの二重経路
//!
//! REST 取得と join 後の socket history イベントは意図的に競争させます。
//! 先に解決した方が先に描画され、後から来た方は冪等マージで無害に
//! 吸収されます。socket の認証・join が遅いときの保険であり、「修正」して
//! 片方に寄せてはいけません。

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::watch;

use manabi_shared::time::{Clock, SystemClock};

use crate::common::bus::Subscription;
use crate::domain::{
    ChatEvent, ChatMessage, ChatTransport, CredentialStore, EventKind, HistoryLoader, MessageBody,
    MessageId, MessageKind, RoomId, Timeline, Timestamp, UserId, ValidationError,
};

/// REST 履歴ロードのデフォルト取得件数
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// アタッチメントの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Ready,
}

/// 送信時のローカル検証エラー
///
/// ネットワーク起因の失敗はここには現れません（fire-and-forget で、
/// 失敗はイベントバスの Error カテゴリに流れる）。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    #[error(transparent)]
    InvalidBody(#[from] ValidationError),

    #[error("room session is not attached")]
    NotAttached,
}

/// ハンドラ・非同期タスクと共有される内部状態
struct SessionShared {
    room_id: RoomId,
    current_user: UserId,
    transport: Arc<dyn ChatTransport>,
    clock: Arc<dyn Clock>,
    timeline: Mutex<Timeline>,
    state: Mutex<SessionState>,
    /// このアタッチメントが既読レシートを送った ID の集合
    ///
    /// 再描画のたびに重複送信しないためのセッションスコープの dedup。
    /// 永続化はしないので、同じルームを離れて戻ると再送され得る（無害）。
    marked_read: Mutex<HashSet<MessageId>>,
    participants: Mutex<BTreeSet<UserId>>,
    last_error: Mutex<Option<String>>,
    /// detach のたびに進む世代番号。解決の遅れた REST レスポンスの破棄用
    generation: AtomicU64,
    visible_tx: watch::Sender<Vec<ChatMessage>>,
}

impl SessionShared {
    fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// バッチをタイムラインへ重ね、可視スナップショットを原子的に差し替える
    fn apply_batch(&self, batch: Vec<ChatMessage>, completes_load: bool) {
        let visible = {
            let mut timeline = self.timeline.lock().unwrap_or_else(PoisonError::into_inner);
            timeline.apply(batch);
            timeline.visible()
        };
        if completes_load {
            self.complete_load();
        }
        self.visible_tx.send_replace(visible);
        self.acknowledge_visible();
    }

    /// 初期ロード完了（Connecting のときだけ Ready へ進める）
    fn complete_load(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == SessionState::Connecting {
            *state = SessionState::Ready;
        }
    }

    /// 可視メッセージのうち未読の他者メッセージへ既読レシートを 1 回ずつ送る
    ///
    /// 切断中はスキップ（marked_read にも入れないので、復帰後の再描画で
    /// 改めて送られる）。
    fn acknowledge_visible(&self) {
        if !self.transport.is_connected() {
            tracing::debug!(
                room_id = self.room_id.as_str(),
                "socket offline, deferring read receipts"
            );
            return;
        }
        let visible = self.visible_tx.borrow().clone();
        let mut marked = self
            .marked_read
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for message in &visible {
            if message.authored_by(&self.current_user)
                || message.is_read()
                || marked.contains(&message.id)
            {
                continue;
            }
            self.transport.mark_read(&message.id);
            marked.insert(message.id.clone());
        }
    }

    /// message-read イベントの反映
    ///
    /// このイベントはルーム ID を運ばないため、タイムラインに ID が
    /// あるかどうかでルームフィルタの代わりとします。既読時刻は
    /// ペイロードに無いのでローカル時計で刻印します。
    fn apply_message_read(&self, message_id: &MessageId) {
        let visible = {
            let mut timeline = self.timeline.lock().unwrap_or_else(PoisonError::into_inner);
            if !timeline.contains(message_id) {
                return;
            }
            let read_at = match Timestamp::new(self.clock.now_rfc3339()) {
                Ok(read_at) => read_at,
                Err(e) => {
                    tracing::debug!(error = %e, "clock produced invalid timestamp");
                    return;
                }
            };
            if !timeline.mark_read(message_id, read_at) {
                return;
            }
            timeline.visible()
        };
        self.visible_tx.send_replace(visible);
    }

    fn record_error(&self, message: String) {
        *self
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(message);
    }
}

/// ルームアタッチメント
///
/// UI コンポーネントのマウントと同時に生成して `attach()`、アンマウントで
/// `detach()`（または Drop）します。ルーム ID が変わる場合は作り直します。
/// 共有トランスポートは所有せず、detach しても接続は生き続けます。
pub struct RoomSession {
    shared: Arc<SessionShared>,
    history: Arc<dyn HistoryLoader>,
    credentials: Arc<dyn CredentialStore>,
    history_limit: usize,
    subscriptions: Vec<Subscription<ChatEvent>>,
    visible_rx: watch::Receiver<Vec<ChatMessage>>,
}

impl RoomSession {
    pub fn new(
        room_id: RoomId,
        current_user: UserId,
        transport: Arc<dyn ChatTransport>,
        history: Arc<dyn HistoryLoader>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        let (visible_tx, visible_rx) = watch::channel(Vec::new());
        Self {
            shared: Arc::new(SessionShared {
                room_id,
                current_user,
                transport,
                clock: Arc::new(SystemClock),
                timeline: Mutex::new(Timeline::new()),
                state: Mutex::new(SessionState::Idle),
                marked_read: Mutex::new(HashSet::new()),
                participants: Mutex::new(BTreeSet::new()),
                last_error: Mutex::new(None),
                generation: AtomicU64::new(0),
                visible_tx,
            }),
            history,
            credentials,
            history_limit: DEFAULT_HISTORY_LIMIT,
            subscriptions: Vec::new(),
            visible_rx,
        }
    }

    /// テスト用に時計を差し替える
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        // shared はまだ誰とも共有されていない（attach 前にのみ呼ばれる想定）
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.clock = clock;
        }
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// ルームへアタッチする（マウント時に 1 回）
    ///
    /// トークンが無ければ socket への接続はスキップされますが、REST 履歴
    /// ロードは行われます（socket 不在でも読める画面にする）。
    pub fn attach(&mut self) {
        if !self.subscriptions.is_empty() {
            tracing::debug!(room_id = self.shared.room_id.as_str(), "already attached");
            return;
        }
        self.shared.set_state(SessionState::Connecting);

        match self.credentials.bearer_token() {
            Some(token) => self.shared.transport.connect(token),
            None => tracing::debug!(
                room_id = self.shared.room_id.as_str(),
                "no bearer token, skipping socket connect"
            ),
        }

        self.subscribe_handlers();
        self.shared.transport.join(&self.shared.room_id);
        self.spawn_history_load();
    }

    /// ルームからデタッチする（アンマウント時）
    ///
    /// 自分のハンドラと leave だけで、共有接続には触れません。
    pub fn detach(&mut self) {
        if self.subscriptions.is_empty() {
            return;
        }
        self.shared.transport.leave(&self.shared.room_id);
        // Drop が購読を解除する
        self.subscriptions.clear();
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.set_state(SessionState::Idle);
    }

    /// メッセージを送信する
    ///
    /// fire-and-forget。送ったメッセージはローカルでは描画せず、サーバ
    /// 採番 ID 付きの new-message echo が届いたときに初めて現れます
    /// （ブロードキャストとの二重描画を避ける）。
    pub fn send(
        &self,
        body: &str,
        kind: MessageKind,
        file_url: Option<String>,
    ) -> Result<(), SendMessageError> {
        if self.subscriptions.is_empty() {
            return Err(SendMessageError::NotAttached);
        }
        let body = MessageBody::new(body.to_string())?;
        self.shared
            .transport
            .send_message(&self.shared.room_id, body, kind, file_url);
        Ok(())
    }

    /// 可視メッセージへの既読レシート送信（再描画時に呼んでも重複しない）
    pub fn acknowledge_visible(&self) {
        self.shared.acknowledge_visible();
    }

    /// 現在の可視メッセージ（created_at 昇順）
    pub fn visible(&self) -> Vec<ChatMessage> {
        self.visible_rx.borrow().clone()
    }

    /// 可視メッセージの watch レシーバ（UI の再描画トリガ）
    pub fn watch_visible(&self) -> watch::Receiver<Vec<ChatMessage>> {
        self.visible_rx.clone()
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.state() == SessionState::Connecting
    }

    /// 在室中の参加者のスナップショット（ID 昇順）
    pub fn participants(&self) -> Vec<UserId> {
        self.shared
            .participants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// 最後に観測したエラーメッセージ（トースト表示用）
    pub fn last_error(&self) -> Option<String> {
        self.shared
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn room_id(&self) -> &RoomId {
        &self.shared.room_id
    }

    fn subscribe_handlers(&mut self) {
        let events = self.shared.transport.events();

        let shared = self.shared.clone();
        self.subscriptions
            .push(events.subscribe(EventKind::History, move |event| {
                if let ChatEvent::History { room_id, messages } = event
                    && *room_id == shared.room_id
                {
                    shared.apply_batch(messages.clone(), true);
                }
            }));

        let shared = self.shared.clone();
        self.subscriptions
            .push(events.subscribe(EventKind::NewMessage, move |event| {
                if let ChatEvent::NewMessage { room_id, message } = event
                    && *room_id == shared.room_id
                {
                    shared.apply_batch(vec![message.clone()], false);
                }
            }));

        let shared = self.shared.clone();
        self.subscriptions
            .push(events.subscribe(EventKind::Joined, move |event| {
                if let ChatEvent::Joined { room_id } = event
                    && *room_id == shared.room_id
                {
                    tracing::info!(room_id = room_id.as_str(), "joined chat room");
                }
            }));

        let shared = self.shared.clone();
        self.subscriptions
            .push(events.subscribe(EventKind::Error, move |event| {
                if let ChatEvent::Error { message, code } = event {
                    tracing::warn!(
                        room_id = shared.room_id.as_str(),
                        code = code.as_deref().unwrap_or("-"),
                        "chat error: {message}"
                    );
                    shared.record_error(message.clone());
                }
            }));

        let shared = self.shared.clone();
        self.subscriptions
            .push(events.subscribe(EventKind::UserJoined, move |event| {
                if let ChatEvent::UserJoined { room_id, user_id } = event
                    && *room_id == shared.room_id
                {
                    shared
                        .participants
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(user_id.clone());
                }
            }));

        let shared = self.shared.clone();
        self.subscriptions
            .push(events.subscribe(EventKind::UserLeft, move |event| {
                if let ChatEvent::UserLeft { room_id, user_id } = event
                    && *room_id == shared.room_id
                {
                    shared
                        .participants
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .remove(user_id);
                }
            }));

        let shared = self.shared.clone();
        self.subscriptions
            .push(events.subscribe(EventKind::MessageRead, move |event| {
                if let ChatEvent::MessageRead { message_id } = event {
                    shared.apply_message_read(message_id);
                }
            }));
    }

    fn spawn_history_load(&self) {
        let shared = self.shared.clone();
        let history = self.history.clone();
        let limit = self.history_limit;
        let generation = shared.generation.load(Ordering::SeqCst);

        tokio::spawn(async move {
            let result = history.recent_messages(&shared.room_id, limit).await;
            if shared.generation.load(Ordering::SeqCst) != generation {
                tracing::debug!(
                    room_id = shared.room_id.as_str(),
                    "room detached before history resolved, dropping response"
                );
                return;
            }
            match result {
                Ok(messages) => shared.apply_batch(messages, true),
                Err(e) => {
                    tracing::warn!(
                        room_id = shared.room_id.as_str(),
                        error = %e,
                        "history load failed"
                    );
                    shared.record_error(e.to_string());
                    // 読み込み中表示は解除し、空のまま socket 履歴を待つ
                    shared.complete_load();
                }
            }
        });
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        self.detach();
    }
}
