//! 汎用イベントバス（購読レジストリ）
//!
//! UI コンポーネントをトランスポートの生イベント名から切り離すための
//! 小さな in-process publish/subscribe。カテゴリごとに複数ハンドラを
//! 登録でき、登録順に通知されます。booking / consultation の 2 ドメインで
//! 同じ実装を共有するため、イベント型をパラメータ化してあります。
//!
//! - `subscribe` は `Subscription` を返し、`cancel()`（冪等）または Drop で
//!   購読解除される
//! - `clear` は全カテゴリの全ハンドラを消す。アプリケーションレベルの
//!   `disconnect()` 専用で、ルーム単位の後片付けでは各アタッチメントが
//!   自分の `Subscription` を落とすだけ

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use uuid::Uuid;

/// バスに流せるイベント型
pub trait Event {
    /// 購読のキーになるカテゴリ型
    type Kind: Copy + Eq + Hash + Send;

    fn kind(&self) -> Self::Kind;
}

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct HandlerEntry<E> {
    id: Uuid,
    handler: Handler<E>,
}

type HandlerMap<E> = Mutex<HashMap<<E as Event>::Kind, Vec<HandlerEntry<E>>>>;

/// カテゴリ別ハンドラレジストリ
pub struct EventBus<E: Event> {
    // Subscription が Weak で参照するため Arc で持つ
    handlers: Arc<HandlerMap<E>>,
}

impl<E: Event> EventBus<E> {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// カテゴリにハンドラを登録する
    ///
    /// 返された `Subscription` が生きている間だけ通知されます。
    pub fn subscribe(
        &self,
        kind: E::Kind,
        handler: impl Fn(&E) + Send + Sync + 'static,
    ) -> Subscription<E> {
        let id = Uuid::new_v4();
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push(HandlerEntry {
                id,
                handler: Arc::new(handler),
            });
        Subscription {
            handlers: Arc::downgrade(&self.handlers),
            kind,
            id,
        }
    }

    /// イベントをそのカテゴリの全ハンドラへ登録順に配送する
    ///
    /// ハンドラ内から購読・解除できるよう、呼び出しはロックの外で行います。
    pub fn dispatch(&self, event: &E) {
        let snapshot: Vec<Handler<E>> = {
            let handlers = self
                .handlers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            handlers
                .get(&event.kind())
                .map(|entries| entries.iter().map(|entry| entry.handler.clone()).collect())
                .unwrap_or_default()
        };
        for handler in snapshot {
            handler(event);
        }
    }

    /// 全カテゴリの全ハンドラを消す（アプリケーションレベルの切断専用）
    pub fn clear(&self) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// カテゴリに登録されているハンドラ数
    pub fn handler_count(&self, kind: E::Kind) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// 購読ハンドル
///
/// `cancel()` は何度呼んでも安全（ID による削除は自然に冪等）。Drop でも
/// 解除されるため、ルームアタッチメントはこれを保持するだけで
/// アンマウント時に自分のハンドラだけを確実に片付けられます。
pub struct Subscription<E: Event> {
    handlers: Weak<HandlerMap<E>>,
    kind: E::Kind,
    id: Uuid,
}

impl<E: Event> Subscription<E> {
    /// 購読を解除する（冪等）
    pub fn cancel(&self) {
        if let Some(handlers) = self.handlers.upgrade() {
            let mut handlers = handlers.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(entries) = handlers.get_mut(&self.kind) {
                entries.retain(|entry| entry.id != self.id);
            }
        }
    }
}

impl<E: Event> Drop for Subscription<E> {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum TestEvent {
        Ping(u32),
        Pong,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum TestKind {
        Ping,
        Pong,
    }

    impl Event for TestEvent {
        type Kind = TestKind;

        fn kind(&self) -> TestKind {
            match self {
                TestEvent::Ping(_) => TestKind::Ping,
                TestEvent::Pong => TestKind::Pong,
            }
        }
    }

    #[test]
    fn test_handlers_invoked_in_registration_order() {
        // テスト項目: 同一カテゴリの複数ハンドラが登録順に呼ばれる
        // given (前提条件):
        let bus = EventBus::<TestEvent>::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let order_a = order.clone();
        let _sub_a = bus.subscribe(TestKind::Ping, move |_| {
            order_a.lock().unwrap().push("a");
        });
        let order_b = order.clone();
        let _sub_b = bus.subscribe(TestKind::Ping, move |_| {
            order_b.lock().unwrap().push("b");
        });

        // when (操作):
        bus.dispatch(&TestEvent::Ping(1));

        // then (期待する結果):
        assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_dispatch_only_reaches_matching_category() {
        // テスト項目: イベントは自分のカテゴリのハンドラにだけ届く
        // given (前提条件):
        let bus = EventBus::<TestEvent>::new();
        let ping_count = Arc::new(AtomicUsize::new(0));
        let pong_count = Arc::new(AtomicUsize::new(0));

        let ping_counter = ping_count.clone();
        let _ping_sub = bus.subscribe(TestKind::Ping, move |_| {
            ping_counter.fetch_add(1, Ordering::SeqCst);
        });
        let pong_counter = pong_count.clone();
        let _pong_sub = bus.subscribe(TestKind::Pong, move |_| {
            pong_counter.fetch_add(1, Ordering::SeqCst);
        });

        // when (操作):
        bus.dispatch(&TestEvent::Ping(1));
        bus.dispatch(&TestEvent::Ping(2));

        // then (期待する結果):
        assert_eq!(ping_count.load(Ordering::SeqCst), 2);
        assert_eq!(pong_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        // テスト項目: cancel を 2 回呼んでも他の購読に影響しない
        // given (前提条件):
        let bus = EventBus::<TestEvent>::new();
        let count = Arc::new(AtomicUsize::new(0));

        let counter = count.clone();
        let sub_a = bus.subscribe(TestKind::Ping, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = count.clone();
        let _sub_b = bus.subscribe(TestKind::Ping, move |_| {
            counter.fetch_add(10, Ordering::SeqCst);
        });

        // when (操作):
        sub_a.cancel();
        sub_a.cancel();
        bus.dispatch(&TestEvent::Ping(1));

        // then (期待する結果): sub_b だけが呼ばれる
        assert_eq!(count.load(Ordering::SeqCst), 10);
        assert_eq!(bus.handler_count(TestKind::Ping), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        // テスト項目: Subscription の Drop で購読が解除される
        // given (前提条件):
        let bus = EventBus::<TestEvent>::new();
        let count = Arc::new(AtomicUsize::new(0));

        {
            let counter = count.clone();
            let _sub = bus.subscribe(TestKind::Ping, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        // when (操作):
        bus.dispatch(&TestEvent::Ping(1));

        // then (期待する結果):
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(bus.handler_count(TestKind::Ping), 0);
    }

    #[test]
    fn test_clear_removes_all_categories() {
        // テスト項目: clear が全カテゴリのハンドラを消す
        // given (前提条件):
        let bus = EventBus::<TestEvent>::new();
        let _sub_a = bus.subscribe(TestKind::Ping, |_| {});
        let _sub_b = bus.subscribe(TestKind::Pong, |_| {});

        // when (操作):
        bus.clear();

        // then (期待する結果):
        assert_eq!(bus.handler_count(TestKind::Ping), 0);
        assert_eq!(bus.handler_count(TestKind::Pong), 0);
    }

    #[test]
    fn test_cancel_after_clear_is_harmless() {
        // テスト項目: clear 済みのバスに対する cancel も安全
        // given (前提条件):
        let bus = EventBus::<TestEvent>::new();
        let sub = bus.subscribe(TestKind::Ping, |_| {});
        bus.clear();

        // when (操作):
        sub.cancel();

        // then (期待する結果): パニックしない
        assert_eq!(bus.handler_count(TestKind::Ping), 0);
    }

    #[test]
    fn test_subscribe_during_dispatch_does_not_deadlock() {
        // テスト項目: ハンドラ内からの購読登録がデッドロックしない
        // given (前提条件):
        let bus = Arc::new(EventBus::<TestEvent>::new());
        let late_subs = Arc::new(Mutex::new(Vec::new()));

        let bus_inner = bus.clone();
        let late_subs_inner = late_subs.clone();
        let _sub = bus.subscribe(TestKind::Ping, move |_| {
            let sub = bus_inner.subscribe(TestKind::Pong, |_| {});
            late_subs_inner.lock().unwrap().push(sub);
        });

        // when (操作):
        bus.dispatch(&TestEvent::Ping(1));

        // then (期待する結果):
        assert_eq!(bus.handler_count(TestKind::Pong), 1);
    }
}
