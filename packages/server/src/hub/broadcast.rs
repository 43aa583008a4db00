//! Broadcast hub.
//!
//! A single task owns the membership set and handles `register`,
//! `unregister` and `publish` one at a time, each arriving on its own
//! channel. [`Hub`] is the cloneable handle used to feed that task.
//!
//! Fan-out is a non-blocking enqueue per member. A member whose outbound
//! queue is full is dropped from the set on the spot, which closes its queue
//! and lets its writer loop exit; one slow client never holds up the others.
//! Fan-out cost is linear in the number of live sessions.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{mpsc, oneshot};

use super::session::{
    Outbound, OutboundReceiver, OutboundSender, SessionId, SessionIdGenerator,
};
use crate::domain::ChatMessage;

/// Capacity of the publish channel feeding the hub loop.
const PUBLISH_QUEUE_CAPACITY: usize = 1024;

/// Error returned when the hub loop is no longer running.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("hub is not running")]
pub struct HubClosed;

/// Handle to a running hub.
///
/// Cheap to clone. The hub loop stops once every handle is dropped.
#[derive(Clone)]
pub struct Hub {
    register_tx: mpsc::UnboundedSender<(SessionId, OutboundSender)>,
    unregister_tx: mpsc::UnboundedSender<SessionId>,
    publish_tx: mpsc::Sender<Outbound>,
    members_tx: mpsc::UnboundedSender<oneshot::Sender<Vec<SessionId>>>,
    ids: Arc<SessionIdGenerator>,
    outbound_capacity: usize,
}

impl Hub {
    /// Start a hub loop on the current tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `outbound_capacity` - Capacity of each session's outbound queue
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(outbound_capacity: usize) -> Self {
        let (register_tx, register_rx) = mpsc::unbounded_channel();
        let (unregister_tx, unregister_rx) = mpsc::unbounded_channel();
        let (publish_tx, publish_rx) = mpsc::channel(PUBLISH_QUEUE_CAPACITY);
        let (members_tx, members_rx) = mpsc::unbounded_channel();

        let inputs = HubInputs {
            register_rx,
            unregister_rx,
            publish_rx,
            members_rx,
        };
        tokio::spawn(inputs.run());

        Self {
            register_tx,
            unregister_tx,
            publish_tx,
            members_tx,
            ids: Arc::new(SessionIdGenerator::default()),
            outbound_capacity,
        }
    }

    /// Allocate a session, create its outbound queue and register it.
    ///
    /// The hub keeps the only sender; the returned receiver ends when the
    /// session is unregistered or evicted.
    pub fn open_session(&self) -> Result<(SessionId, OutboundReceiver), HubClosed> {
        let id = self.ids.next();
        let (tx, rx) = mpsc::channel(self.outbound_capacity);
        self.register(id, tx)?;
        Ok((id, rx))
    }

    /// Add a session to the membership set.
    pub fn register(&self, id: SessionId, outbound: OutboundSender) -> Result<(), HubClosed> {
        self.register_tx.send((id, outbound)).map_err(|_| HubClosed)
    }

    /// Remove a session and close its outbound queue. No-op for unknown ids.
    pub fn unregister(&self, id: SessionId) {
        // Fails only when the loop is gone, in which case nothing is registered.
        let _ = self.unregister_tx.send(id);
    }

    /// Hand a persisted message to the hub for fan-out to every member.
    pub async fn publish(&self, message: ChatMessage) -> Result<(), HubClosed> {
        self.publish_tx
            .send(Arc::new(message))
            .await
            .map_err(|_| HubClosed)
    }

    /// Current members, after every input issued before this call.
    pub async fn members(&self) -> Result<Vec<SessionId>, HubClosed> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.members_tx.send(reply_tx).map_err(|_| HubClosed)?;
        let mut members = reply_rx.await.map_err(|_| HubClosed)?;
        members.sort();
        Ok(members)
    }
}

/// Receiving ends owned by the hub loop.
struct HubInputs {
    register_rx: mpsc::UnboundedReceiver<(SessionId, OutboundSender)>,
    unregister_rx: mpsc::UnboundedReceiver<SessionId>,
    publish_rx: mpsc::Receiver<Outbound>,
    members_rx: mpsc::UnboundedReceiver<oneshot::Sender<Vec<SessionId>>>,
}

impl HubInputs {
    async fn run(mut self) {
        let mut membership = Membership::default();
        tracing::debug!("hub loop started");

        loop {
            // Priority order: a later stage observes everything queued on the
            // earlier ones.
            tokio::select! {
                biased;
                Some((id, outbound)) = self.register_rx.recv() => {
                    membership.register(id, outbound);
                    tracing::debug!(%id, members = membership.len(), "session registered");
                }
                Some(id) = self.unregister_rx.recv() => {
                    if membership.unregister(id) {
                        tracing::debug!(%id, members = membership.len(), "session unregistered");
                    }
                }
                Some(message) = self.publish_rx.recv() => {
                    let report = membership.fan_out(&message);
                    for id in &report.evicted {
                        tracing::info!(%id, message_id = %message.id, "outbound queue full, session evicted");
                    }
                    tracing::debug!(
                        message_id = %message.id,
                        delivered = report.delivered,
                        evicted = report.evicted.len(),
                        "message broadcast"
                    );
                }
                Some(reply) = self.members_rx.recv() => {
                    let _ = reply.send(membership.ids());
                }
                else => break,
            }
        }

        tracing::debug!("hub loop stopped");
    }
}

/// Outcome of one fan-out.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct FanOutReport {
    pub delivered: usize,
    pub evicted: Vec<SessionId>,
}

/// Membership set. Touched only from the hub loop.
#[derive(Default)]
pub(crate) struct Membership {
    sessions: HashMap<SessionId, OutboundSender>,
}

impl Membership {
    pub(crate) fn register(&mut self, id: SessionId, outbound: OutboundSender) {
        self.sessions.insert(id, outbound);
    }

    /// Returns whether the session was a member.
    pub(crate) fn unregister(&mut self, id: SessionId) -> bool {
        // Dropping the sender closes the queue once it is drained.
        self.sessions.remove(&id).is_some()
    }

    pub(crate) fn fan_out(&mut self, message: &Outbound) -> FanOutReport {
        let mut report = FanOutReport::default();
        self.sessions
            .retain(|id, outbound| match outbound.try_send(Arc::clone(message)) {
                Ok(()) => {
                    report.delivered += 1;
                    true
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    report.evicted.push(*id);
                    false
                }
                // Writer already gone; the pending unregister becomes a no-op.
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            });
        report.evicted.sort();
        report
    }

    pub(crate) fn ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Author, MessageId, MessageText, NewChatMessage, UserId, Username};
    use chrono::Utc;
    use std::{collections::HashSet, time::Duration};

    fn create_test_message(id: i64, text: &str) -> ChatMessage {
        let author = Author::new(UserId::new(1), Username::new("alice".to_string()).unwrap());
        let text = MessageText::new(text.to_string()).unwrap();
        ChatMessage::persisted(
            NewChatMessage::new(author, text),
            MessageId::new(id),
            Utc::now(),
        )
    }

    #[test]
    fn test_membership_applies_operations_in_order() {
        // テスト項目: register / unregister を順に適用した結果がメンバー集合と一致する
        // given (前提条件):
        let mut membership = Membership::default();
        let mut expected = HashSet::new();
        let mut receivers = Vec::new();
        let ops: [(bool, u64); 9] = [
            (true, 1),
            (true, 2),
            (true, 3),
            (false, 2),
            (false, 2),
            (true, 4),
            (false, 1),
            (false, 9),
            (true, 5),
        ];

        // when (操作):
        for (is_register, raw) in ops {
            let id = SessionId::new(raw);
            if is_register {
                let (tx, rx) = mpsc::channel(4);
                receivers.push(rx);
                membership.register(id, tx);
                expected.insert(id);
            } else {
                membership.unregister(id);
                expected.remove(&id);
            }
        }

        // then (期待する結果):
        let actual: HashSet<_> = membership.ids().into_iter().collect();
        assert_eq!(actual, expected);
        assert_eq!(membership.len(), 3);
    }

    #[test]
    fn test_unregister_closes_outbound_queue() {
        // テスト項目: unregister すると送信キューが閉じられる
        // given (前提条件):
        let mut membership = Membership::default();
        let id = SessionId::new(1);
        let (tx, mut rx) = mpsc::channel(4);
        membership.register(id, tx);

        // when (操作):
        let removed = membership.unregister(id);

        // then (期待する結果):
        assert!(removed);
        assert!(rx.try_recv().is_err());
        assert!(rx.is_closed());
    }

    #[test]
    fn test_unregister_twice_is_noop() {
        // テスト項目: 二重の unregister は 1 回目と同じ結果になる
        // given (前提条件):
        let mut membership = Membership::default();
        let (tx, _rx) = mpsc::channel(4);
        membership.register(SessionId::new(1), tx);

        // when (操作):
        let first = membership.unregister(SessionId::new(1));
        let second = membership.unregister(SessionId::new(1));

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert_eq!(membership.len(), 0);
    }

    #[test]
    fn test_fan_out_evicts_full_queue_only() {
        // テスト項目: キューが満杯のセッションだけが排除され、他には配信される
        // given (前提条件): slow は容量 1 で読み出さない
        let mut membership = Membership::default();
        let (slow_tx, mut slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = mpsc::channel(8);
        membership.register(SessionId::new(1), slow_tx);
        membership.register(SessionId::new(2), fast_tx);

        // when (操作):
        let first = membership.fan_out(&Arc::new(create_test_message(1, "one")));
        let second = membership.fan_out(&Arc::new(create_test_message(2, "two")));

        // then (期待する結果):
        assert_eq!(first.delivered, 2);
        assert!(first.evicted.is_empty());
        assert_eq!(second.delivered, 1);
        assert_eq!(second.evicted, vec![SessionId::new(1)]);
        assert_eq!(membership.ids(), vec![SessionId::new(2)]);

        assert_eq!(fast_rx.try_recv().unwrap().text.as_str(), "one");
        assert_eq!(fast_rx.try_recv().unwrap().text.as_str(), "two");

        // slow keeps what was queued, then sees its queue closed
        assert_eq!(slow_rx.try_recv().unwrap().text.as_str(), "one");
        assert!(slow_rx.try_recv().is_err());
        assert!(slow_rx.is_closed());
    }

    #[test]
    fn test_fan_out_drops_closed_receivers_silently() {
        // テスト項目: 受信側が閉じたセッションは排除扱いにせず除去される
        // given (前提条件):
        let mut membership = Membership::default();
        let (tx, rx) = mpsc::channel(4);
        membership.register(SessionId::new(1), tx);
        drop(rx);

        // when (操作):
        let report = membership.fan_out(&Arc::new(create_test_message(1, "hi")));

        // then (期待する結果):
        assert_eq!(report, FanOutReport::default());
        assert_eq!(membership.len(), 0);
    }

    #[tokio::test]
    async fn test_hub_members_reflect_inputs_in_order() {
        // テスト項目: Hub に発行した入力がすべて処理された後のメンバー集合を取得できる
        // given (前提条件):
        let hub = Hub::spawn(8);
        let (a, _rx_a) = hub.open_session().unwrap();
        let (b, _rx_b) = hub.open_session().unwrap();
        let (c, _rx_c) = hub.open_session().unwrap();

        // when (操作):
        hub.unregister(b);
        hub.unregister(b);
        let members = hub.members().await.unwrap();

        // then (期待する結果):
        assert_eq!(members, vec![a, c]);
    }

    #[tokio::test]
    async fn test_hub_publish_reaches_every_member_in_order() {
        // テスト項目: publish したメッセージが発行順に全メンバーへ届く
        // given (前提条件):
        let hub = Hub::spawn(8);
        let (_a, mut rx_a) = hub.open_session().unwrap();
        let (_b, mut rx_b) = hub.open_session().unwrap();

        // when (操作):
        hub.publish(create_test_message(1, "first")).await.unwrap();
        hub.publish(create_test_message(2, "second")).await.unwrap();

        // then (期待する結果):
        for rx in [&mut rx_a, &mut rx_b] {
            assert_eq!(rx.recv().await.unwrap().id, MessageId::new(1));
            assert_eq!(rx.recv().await.unwrap().id, MessageId::new(2));
        }
    }

    #[tokio::test]
    async fn test_hub_evicts_saturated_session_without_delaying_others() {
        // テスト項目: 読み出さないセッションは次の publish で排除され、他への配信は遅延しない
        // given (前提条件): 容量 2 で slow は読み出さない
        let hub = Hub::spawn(2);
        let (slow, mut slow_rx) = hub.open_session().unwrap();
        let (fast, mut fast_rx) = hub.open_session().unwrap();

        // when (操作):
        for id in 1..=3 {
            hub.publish(create_test_message(id, "msg")).await.unwrap();
            let received = tokio::time::timeout(Duration::from_secs(1), fast_rx.recv())
                .await
                .expect("fast session must not be delayed")
                .unwrap();
            assert_eq!(received.id, MessageId::new(id));
        }

        // then (期待する結果):
        let members = hub.members().await.unwrap();
        assert_eq!(members, vec![fast]);
        assert!(!members.contains(&slow));

        // queued messages drain, then the queue reports closed
        assert_eq!(slow_rx.recv().await.unwrap().id, MessageId::new(1));
        assert_eq!(slow_rx.recv().await.unwrap().id, MessageId::new(2));
        assert!(slow_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_unregister_ends_writer_queue() {
        // テスト項目: unregister 後、送信キューは残りを返してから None を返す
        // given (前提条件):
        let hub = Hub::spawn(8);
        let (id, mut rx) = hub.open_session().unwrap();
        hub.publish(create_test_message(1, "last")).await.unwrap();

        // when (操作):
        hub.unregister(id);

        // then (期待する結果):
        assert_eq!(rx.recv().await.unwrap().id, MessageId::new(1));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_session_ids_are_unique() {
        // テスト項目: open_session は毎回異なる ID を払い出す
        // given (前提条件):
        let hub = Hub::spawn(1);

        // when (操作):
        let (a, _rx_a) = hub.open_session().unwrap();
        let (b, _rx_b) = hub.open_session().unwrap();

        // then (期待する結果):
        assert_ne!(a, b);
    }
}
