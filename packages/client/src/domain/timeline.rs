//! メッセージ調停（reconciliation）エンジン
//!
//! 履歴スナップショット（REST または socket 経由）とライブ push という
//! 独立した 2 系統から届くメッセージを、到着順に関係なく重複なしの
//! 時系列ビューに統合します。
//!
//! ## アルゴリズム（merge-by-id-ascending）
//!
//! - 可視集合を「メッセージ ID → メッセージ」のマップとして保持する
//! - バッチ適用時、同一 ID は受信側が勝つ（last-write-wins）。既読時刻の
//!   更新などで後から届いたコピーの方が新しいため
//! - 表示順は created_at の昇順。フォーマット固定の RFC 3339 文字列なので
//!   辞書順比較で足りる。同時刻は初回到着順で安定
//!
//! この構成によりマージは冪等かつ（ID が素な範囲で）可換になり、同じ
//! メッセージが REST 履歴と socket push の両方から届いても 1 件に収束します。

use std::collections::HashMap;

use super::entity::ChatMessage;
use super::value_object::{MessageId, Timestamp};

#[derive(Debug, Clone)]
struct TimelineEntry {
    /// 初回到着順（タイムスタンプ同着時のタイブレーク）
    seq: u64,
    message: ChatMessage,
}

/// ルーム 1 つ分のマージ済みメッセージ集合
#[derive(Debug, Default)]
pub struct Timeline {
    entries: HashMap<MessageId, TimelineEntry>,
    next_seq: u64,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// バッチ（履歴全件または push 1 件）を可視集合に重ね合わせる
    ///
    /// 既存 ID は受信データで置き換え（到着順 seq は初回のまま保持）、
    /// 新規 ID は到着順を採番して追加します。同一バッチ内に同じ ID が
    /// 複数あった場合は後勝ち（サーバの再送に対するガード）。
    pub fn apply(&mut self, batch: impl IntoIterator<Item = ChatMessage>) {
        for message in batch {
            match self.entries.get_mut(&message.id) {
                Some(entry) => entry.message = message,
                None => {
                    let seq = self.next_seq;
                    self.next_seq += 1;
                    self.entries
                        .insert(message.id.clone(), TimelineEntry { seq, message });
                }
            }
        }
    }

    /// 指定メッセージに既読時刻を付ける（既に既読なら何もしない）
    ///
    /// 付与した場合に true を返します。
    pub fn mark_read(&mut self, message_id: &MessageId, read_at: Timestamp) -> bool {
        match self.entries.get_mut(message_id) {
            Some(entry) if entry.message.read_at.is_none() => {
                entry.message.read_at = Some(read_at);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, message_id: &MessageId) -> bool {
        self.entries.contains_key(message_id)
    }

    pub fn get(&self, message_id: &MessageId) -> Option<&ChatMessage> {
        self.entries.get(message_id).map(|entry| &entry.message)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// created_at 昇順（同時刻は初回到着順）の表示用スナップショット
    pub fn visible(&self) -> Vec<ChatMessage> {
        let mut entries: Vec<&TimelineEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| {
            a.message
                .created_at
                .cmp(&b.message.created_at)
                .then(a.seq.cmp(&b.seq))
        });
        entries.iter().map(|entry| entry.message.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageKind, ParticipantRole, RoomId, Sender, UserId};

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - マージの冪等性（同じバッチを 2 回適用しても結果が変わらない）
    // - ID が素なバッチの適用順に対する可換性
    // - 同一 ID 競合時の後勝ち（既読時刻の更新が反映される）
    // - created_at 昇順の表示順（挿入順に依存しない）
    // - 同時刻メッセージの初回到着順タイブレーク
    //
    // 【なぜこのテストが必要か】
    // - REST 履歴と socket push の競争は設計上常に起きる。どちらが先に
    //   届いても同じ表示に収束することがこのコアの正しさの中心
    // ========================================

    fn message(id: &str, created_at: &str) -> ChatMessage {
        message_from(id, "alice", created_at)
    }

    fn message_from(id: &str, user: &str, created_at: &str) -> ChatMessage {
        ChatMessage {
            id: MessageId::new(id.to_string()).unwrap(),
            room_id: RoomId::new("booking-42".to_string()).unwrap(),
            sender: Sender {
                id: UserId::new(user.to_string()).unwrap(),
                name: user.to_string(),
                role: ParticipantRole::Student,
            },
            body: format!("body of {id}"),
            kind: MessageKind::Text,
            file_url: None,
            created_at: Timestamp::new(created_at.to_string()).unwrap(),
            read_at: None,
        }
    }

    fn ids(messages: &[ChatMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_apply_same_batch_twice_is_idempotent() {
        // テスト項目: 同じ履歴バッチを 2 回適用しても可視集合が変わらない
        // given (前提条件):
        let batch = vec![
            message("m1", "2024-03-01T10:00:00.000Z"),
            message("m2", "2024-03-01T10:01:00.000Z"),
            message("m3", "2024-03-01T10:02:00.000Z"),
        ];
        let mut timeline = Timeline::new();

        // when (操作):
        timeline.apply(batch.clone());
        let once = timeline.visible();
        timeline.apply(batch);
        let twice = timeline.visible();

        // then (期待する結果):
        assert_eq!(once, twice);
        assert_eq!(timeline.len(), 3);
    }

    #[test]
    fn test_disjoint_batches_commute() {
        // テスト項目: ID が素な 2 バッチは適用順を入れ替えても同じ結果になる
        // given (前提条件):
        let batch_a = vec![
            message("m1", "2024-03-01T10:00:00.000Z"),
            message("m3", "2024-03-01T10:02:00.000Z"),
        ];
        let batch_b = vec![
            message("m2", "2024-03-01T10:01:00.000Z"),
            message("m4", "2024-03-01T10:03:00.000Z"),
        ];

        // when (操作):
        let mut ab = Timeline::new();
        ab.apply(batch_a.clone());
        ab.apply(batch_b.clone());
        let mut ba = Timeline::new();
        ba.apply(batch_b);
        ba.apply(batch_a);

        // then (期待する結果):
        assert_eq!(ab.visible(), ba.visible());
        assert_eq!(ids(&ab.visible()), vec!["m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn test_conflicting_id_last_batch_wins() {
        // テスト項目: 同一 ID の競合では後から適用したバッチのデータが勝つ
        // given (前提条件):
        let unread = message("m1", "2024-03-01T10:00:00.000Z");
        let mut read = unread.clone();
        read.read_at = Some(Timestamp::new("2024-01-01T00:00:00Z".to_string()).unwrap());
        let mut timeline = Timeline::new();

        // when (操作):
        timeline.apply(vec![unread]);
        timeline.apply(vec![read.clone()]);

        // then (期待する結果): 既読時刻の付いたコピーに置き換わっている
        let visible = timeline.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].read_at, read.read_at);
    }

    #[test]
    fn test_duplicate_id_within_one_batch_later_wins() {
        // テスト項目: 同一バッチ内の重複 ID は後のエントリが勝つ
        // given (前提条件):
        let first = message("m1", "2024-03-01T10:00:00.000Z");
        let mut second = first.clone();
        second.body = "resent copy".to_string();
        let mut timeline = Timeline::new();

        // when (操作):
        timeline.apply(vec![first, second]);

        // then (期待する結果):
        let visible = timeline.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].body, "resent copy");
    }

    #[test]
    fn test_visible_order_follows_timestamps_not_insertion() {
        // テスト項目: 挿入順に関係なく created_at 昇順で表示される
        // given (前提条件): m7 (10:05) が m6 (10:02) より先に届く
        let m7 = message("m7", "2024-03-01T10:05:00.000Z");
        let m6 = message("m6", "2024-03-01T10:02:00.000Z");
        let mut timeline = Timeline::new();

        // when (操作):
        timeline.apply(vec![m7]);
        timeline.apply(vec![m6]);

        // then (期待する結果):
        assert_eq!(ids(&timeline.visible()), vec!["m6", "m7"]);
    }

    #[test]
    fn test_equal_timestamps_keep_arrival_order() {
        // テスト項目: 同時刻のメッセージは初回到着順で安定に並ぶ
        // given (前提条件):
        let at = "2024-03-01T10:00:00.000Z";
        let mut timeline = Timeline::new();

        // when (操作):
        timeline.apply(vec![message("m2", at)]);
        timeline.apply(vec![message("m1", at)]);
        // m2 を上書きしても到着順は変わらない
        timeline.apply(vec![message("m2", at)]);

        // then (期待する結果):
        assert_eq!(ids(&timeline.visible()), vec!["m2", "m1"]);
    }

    #[test]
    fn test_history_and_push_overlap_collapses_to_one() {
        // テスト項目: REST 履歴と socket push で同じメッセージが届いても 1 件になる
        // given (前提条件):
        let rest_history = vec![
            message("m1", "2024-03-01T10:00:00.000Z"),
            message("m2", "2024-03-01T10:01:00.000Z"),
            message("m3", "2024-03-01T10:02:00.000Z"),
        ];
        let socket_history = vec![
            message("m1", "2024-03-01T10:00:00.000Z"),
            message("m2", "2024-03-01T10:01:00.000Z"),
            message("m3", "2024-03-01T10:02:00.000Z"),
            message("m4", "2024-03-01T10:03:00.000Z"),
        ];
        let mut timeline = Timeline::new();

        // when (操作):
        timeline.apply(rest_history);
        timeline.apply(socket_history);

        // then (期待する結果):
        assert_eq!(ids(&timeline.visible()), vec!["m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn test_mark_read_stamps_once() {
        // テスト項目: mark_read は未読メッセージにのみ既読時刻を付ける
        // given (前提条件):
        let mut timeline = Timeline::new();
        timeline.apply(vec![message("m1", "2024-03-01T10:00:00.000Z")]);
        let id = MessageId::new("m1".to_string()).unwrap();
        let first_read = Timestamp::new("2024-03-01T10:10:00.000Z".to_string()).unwrap();
        let second_read = Timestamp::new("2024-03-01T10:20:00.000Z".to_string()).unwrap();

        // when (操作):
        let first = timeline.mark_read(&id, first_read.clone());
        let second = timeline.mark_read(&id, second_read);

        // then (期待する結果): 2 回目は無視され、最初の時刻が残る
        assert!(first);
        assert!(!second);
        assert_eq!(timeline.get(&id).unwrap().read_at, Some(first_read));
    }

    #[test]
    fn test_mark_read_on_unknown_id_is_noop() {
        // テスト項目: 保持していない ID への mark_read は無視される
        // given (前提条件):
        let mut timeline = Timeline::new();
        let unknown = MessageId::new("m9".to_string()).unwrap();

        // when (操作):
        let marked = timeline.mark_read(
            &unknown,
            Timestamp::new("2024-03-01T10:00:00.000Z".to_string()).unwrap(),
        );

        // then (期待する結果):
        assert!(!marked);
        assert!(timeline.is_empty());
    }
}
