//! Broadcast hub: the registry of live chat connections and its fan-out.
//!
//! The registry sits behind a single reader/writer lock. Admission and removal
//! take the write side; a broadcast holds the read side for the whole fan-out,
//! so it always sees one consistent set of recipients. Recipients whose write
//! fails or times out are closed and removed once the read lock is released.
//!
//! Chat participation is written under its own mutex and re-derived from the
//! registry while that mutex is held, so a leave can never overtake a later
//! join by the same user.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::chat::frame::{Frame, MESSAGE_KIND};
use crate::chat::service::ChatService;
use crate::error::AppError;

/// Write half of a client connection, as seen by the hub.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), AppError>;

    /// Best-effort; closing an already broken connection is not an error.
    async fn close(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

struct Registration {
    user_id: i64,
    outbound: Arc<dyn Outbound>,
}

pub struct Hub {
    connections: RwLock<HashMap<ConnectionId, Registration>>,
    participation: Mutex<()>,
    chat: ChatService,
    send_timeout: Duration,
}

impl Hub {
    pub fn new(chat: ChatService, send_timeout: Duration) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            participation: Mutex::new(()),
            chat,
            send_timeout,
        }
    }

    /// Admit a connection owned by `user_id`.
    pub async fn register(&self, user_id: i64, outbound: Arc<dyn Outbound>) -> ConnectionId {
        let id = ConnectionId::new();

        self.connections
            .write()
            .await
            .insert(id, Registration { user_id, outbound });

        {
            let _participation = self.participation.lock().await;
            if let Err(err) = self.chat.join_chat(user_id).await {
                tracing::warn!(error = %err, user_id, "failed to record chat participation");
            }
        }

        tracing::info!(connection = %id, user_id, "connection registered");
        id
    }

    /// Remove a connection and close it. Returns `false` if it was already gone.
    ///
    /// Closing is bounded by the send timeout; a peer that never acknowledges
    /// is abandoned.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let Some(registration) = self.connections.write().await.remove(&id) else {
            return false;
        };
        let user_id = registration.user_id;

        if tokio::time::timeout(self.send_timeout, registration.outbound.close())
            .await
            .is_err()
        {
            tracing::warn!(connection = %id, user_id, "close timed out");
        }

        {
            let _participation = self.participation.lock().await;
            let still_connected = self
                .connections
                .read()
                .await
                .values()
                .any(|reg| reg.user_id == user_id);
            if !still_connected {
                if let Err(err) = self.chat.leave_chat(user_id).await {
                    tracing::warn!(error = %err, user_id, "failed to clear chat participation");
                }
            }
        }

        tracing::info!(connection = %id, user_id, "connection removed");
        true
    }

    /// Whether `id` is still in the registry.
    pub async fn is_registered(&self, id: ConnectionId) -> bool {
        self.connections.read().await.contains_key(&id)
    }

    /// Handle one inbound frame arriving on `connection`.
    ///
    /// Only `message` frames with a string `content` are acted on: persisted,
    /// then broadcast. Anything else is skipped. Persistence failures are
    /// logged and the message is dropped. Returns `false` once the connection
    /// has been removed; its frames are discarded from then on.
    pub async fn handle_frame(&self, connection: ConnectionId, frame: Frame) -> bool {
        let user_id = match self.connections.read().await.get(&connection) {
            Some(registration) => registration.user_id,
            None => {
                tracing::debug!(%connection, "dropping frame from removed connection");
                return false;
            }
        };

        if frame.kind != MESSAGE_KIND {
            tracing::debug!(kind = %frame.kind, user_id, "ignoring unknown frame kind");
            return true;
        }

        let Some(content) = frame.content() else {
            tracing::debug!(user_id, "skipping message frame without string content");
            return true;
        };

        let message = match self.chat.send_message(user_id, content).await {
            Ok(message) => message,
            Err(AppError::Validation(reason)) => {
                tracing::debug!(user_id, %reason, "skipping invalid message");
                return true;
            }
            Err(err) => {
                tracing::error!(error = %err, user_id, "failed to save message");
                return true;
            }
        };

        self.broadcast(&frame.echo(&message)).await;
        true
    }

    /// Write `frame` to every registered connection, sender included.
    ///
    /// Returns the number of successful deliveries. One failing recipient
    /// never prevents delivery to the others.
    pub async fn broadcast(&self, frame: &Frame) -> usize {
        let text = match serde_json::to_string(frame) {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(error = %err, "failed to encode frame");
                return 0;
            }
        };

        let results = {
            let connections = self.connections.read().await;
            let sends = connections.iter().map(|(id, reg)| {
                let text = text.as_str();
                async move {
                    let result = tokio::time::timeout(self.send_timeout, reg.outbound.send(text)).await;
                    (*id, result)
                }
            });
            join_all(sends).await
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (id, result) in results {
            match result {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => {
                    tracing::error!(connection = %id, error = %err, "failed to send message");
                    failed.push(id);
                }
                Err(_) => {
                    tracing::error!(connection = %id, timeout = ?self.send_timeout, "send timed out");
                    failed.push(id);
                }
            }
        }

        for id in failed {
            self.unregister(id).await;
        }

        delivered
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Distinct user ids with at least one live connection.
    pub async fn connected_users(&self) -> Vec<i64> {
        let mut users: Vec<i64> = self
            .connections
            .read()
            .await
            .values()
            .map(|reg| reg.user_id)
            .collect();
        users.sort_unstable();
        users.dedup();
        users
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Mutex;

    use crate::chat::service::DEFAULT_HISTORY_LIMIT;
    use crate::db::{connect_in_memory, ChatRepository, Message, SqliteStore};

    #[derive(Default)]
    struct RecordingOutbound {
        sent: Mutex<Vec<String>>,
        broken: AtomicBool,
        closed: AtomicBool,
    }

    impl RecordingOutbound {
        fn broken() -> Self {
            let outbound = Self::default();
            outbound.broken.store(true, Ordering::SeqCst);
            outbound
        }

        async fn frames(&self) -> Vec<Frame> {
            self.sent
                .lock()
                .await
                .iter()
                .map(|text| serde_json::from_str(text).unwrap())
                .collect()
        }
    }

    #[async_trait]
    impl Outbound for RecordingOutbound {
        async fn send(&self, text: &str) -> Result<(), AppError> {
            if self.broken.load(Ordering::SeqCst) || self.closed.load(Ordering::SeqCst) {
                return Err(AppError::Transport("connection reset".into()));
            }
            self.sent.lock().await.push(text.to_string());
            Ok(())
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    struct StalledOutbound;

    #[async_trait]
    impl Outbound for StalledOutbound {
        async fn send(&self, _text: &str) -> Result<(), AppError> {
            std::future::pending::<()>().await;
            Ok(())
        }

        async fn close(&self) {}
    }

    /// Neither accepts writes nor ever finishes closing.
    struct WedgedOutbound;

    #[async_trait]
    impl Outbound for WedgedOutbound {
        async fn send(&self, _text: &str) -> Result<(), AppError> {
            std::future::pending::<()>().await;
            Ok(())
        }

        async fn close(&self) {
            std::future::pending::<()>().await;
        }
    }

    /// Chat repository whose participant removal is slow.
    struct SlowLeave {
        inner: SqliteStore,
        delay: Duration,
    }

    #[async_trait]
    impl ChatRepository for SlowLeave {
        async fn save_message(&self, user_id: i64, content: &str) -> Result<Message, AppError> {
            self.inner.save_message(user_id, content).await
        }

        async fn recent_messages(&self, limit: i64) -> Result<Vec<Message>, AppError> {
            self.inner.recent_messages(limit).await
        }

        async fn delete_messages_before(&self, cutoff: i64) -> Result<u64, AppError> {
            self.inner.delete_messages_before(cutoff).await
        }

        async fn add_participant(&self, user_id: i64) -> Result<(), AppError> {
            self.inner.add_participant(user_id).await
        }

        async fn remove_participant(&self, user_id: i64) -> Result<(), AppError> {
            tokio::time::sleep(self.delay).await;
            self.inner.remove_participant(user_id).await
        }

        async fn is_participant(&self, user_id: i64) -> Result<bool, AppError> {
            self.inner.is_participant(user_id).await
        }
    }

    async fn hub() -> (Arc<Hub>, ChatService) {
        let store = SqliteStore::new(connect_in_memory().await.unwrap());
        let chat = ChatService::new(Arc::new(store));
        (Arc::new(Hub::new(chat.clone(), Duration::from_millis(200))), chat)
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone() {
        let (hub, _) = hub().await;

        let mut outbounds = Vec::new();
        for user_id in 1..=5 {
            let outbound = Arc::new(RecordingOutbound::default());
            hub.register(user_id, outbound.clone()).await;
            outbounds.push(outbound);
        }

        let delivered = hub.broadcast(&Frame::chat_message("hello")).await;
        assert_eq!(delivered, 5);

        for outbound in &outbounds {
            assert_eq!(outbound.frames().await, vec![Frame::chat_message("hello")]);
        }
    }

    #[tokio::test]
    async fn test_failed_recipient_is_isolated_and_removed() {
        let (hub, _) = hub().await;

        let healthy: Vec<_> = (0..4).map(|_| Arc::new(RecordingOutbound::default())).collect();
        for (i, outbound) in healthy.iter().enumerate() {
            hub.register(i as i64, outbound.clone()).await;
        }
        let broken = Arc::new(RecordingOutbound::broken());
        hub.register(99, broken.clone()).await;
        assert_eq!(hub.connection_count().await, 5);

        assert_eq!(hub.broadcast(&Frame::chat_message("first")).await, 4);
        assert!(broken.closed.load(Ordering::SeqCst));
        assert_eq!(hub.connection_count().await, 4);

        assert_eq!(hub.broadcast(&Frame::chat_message("second")).await, 4);
        for outbound in &healthy {
            assert_eq!(outbound.frames().await.len(), 2);
        }
    }

    #[tokio::test]
    async fn test_stalled_recipient_times_out() {
        let (hub, _) = hub().await;

        let healthy = Arc::new(RecordingOutbound::default());
        hub.register(1, healthy.clone()).await;
        hub.register(2, Arc::new(StalledOutbound)).await;

        assert_eq!(hub.broadcast(&Frame::chat_message("hi")).await, 1);
        assert_eq!(hub.connection_count().await, 1);
        assert_eq!(healthy.frames().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let (hub, _) = hub().await;

        let outbound = Arc::new(RecordingOutbound::default());
        let id = hub.register(1, outbound.clone()).await;

        assert!(hub.unregister(id).await);
        assert!(!hub.unregister(id).await);
        assert!(outbound.closed.load(Ordering::SeqCst));
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_message_frame_is_persisted_and_echoed() {
        let (hub, chat) = hub().await;

        let sender = Arc::new(RecordingOutbound::default());
        let listener = Arc::new(RecordingOutbound::default());
        let connection = hub.register(7, sender.clone()).await;
        hub.register(8, listener.clone()).await;

        assert!(hub.handle_frame(connection, Frame::chat_message("hi")).await);

        let stored = chat.get_messages(DEFAULT_HISTORY_LIMIT).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].user_id, 7);
        assert_eq!(stored[0].content, "hi");

        let received = listener.frames().await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].content(), Some("hi"));
        assert_eq!(received[0].payload["user_id"], 7);
        assert_eq!(sender.frames().await.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_frames_are_skipped() {
        let (hub, chat) = hub().await;

        let outbound = Arc::new(RecordingOutbound::default());
        let connection = hub.register(1, outbound.clone()).await;

        let mut wrong_type = serde_json::Map::new();
        wrong_type.insert("content".into(), serde_json::Value::from(5));
        for frame in [
            Frame::new(MESSAGE_KIND, wrong_type),
            Frame::new(MESSAGE_KIND, serde_json::Map::new()),
            Frame::new("typing", serde_json::Map::new()),
            Frame::chat_message(""),
        ] {
            assert!(hub.handle_frame(connection, frame).await);
        }

        assert!(chat.get_messages(DEFAULT_HISTORY_LIMIT).await.unwrap().is_empty());
        assert!(outbound.frames().await.is_empty());
        assert_eq!(hub.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_participation_follows_last_connection() {
        let (hub, chat) = hub().await;

        let first = hub.register(3, Arc::new(RecordingOutbound::default())).await;
        let second = hub.register(3, Arc::new(RecordingOutbound::default())).await;
        assert!(chat.is_participant(3).await.unwrap());
        assert_eq!(hub.connected_users().await, vec![3]);

        hub.unregister(first).await;
        assert!(chat.is_participant(3).await.unwrap());

        hub.unregister(second).await;
        assert!(!chat.is_participant(3).await.unwrap());
        assert!(hub.connected_users().await.is_empty());
    }

    #[tokio::test]
    async fn test_wedged_recipient_does_not_stall_broadcast() {
        let (hub, _) = hub().await;

        let healthy = Arc::new(RecordingOutbound::default());
        hub.register(1, healthy.clone()).await;
        hub.register(2, Arc::new(WedgedOutbound)).await;

        let delivered = tokio::time::timeout(
            Duration::from_secs(3),
            hub.broadcast(&Frame::chat_message("hi")),
        )
        .await
        .expect("broadcast stalled on a wedged recipient");

        assert_eq!(delivered, 1);
        assert_eq!(hub.connection_count().await, 1);
        assert_eq!(healthy.frames().await.len(), 1);
    }

    #[tokio::test]
    async fn test_frames_from_removed_connection_are_dropped() {
        let (hub, chat) = hub().await;

        let listener = Arc::new(RecordingOutbound::default());
        hub.register(2, listener.clone()).await;
        let connection = hub.register(1, Arc::new(RecordingOutbound::default())).await;

        hub.unregister(connection).await;
        assert!(!hub.is_registered(connection).await);
        assert!(!hub.handle_frame(connection, Frame::chat_message("late")).await);

        assert!(chat.get_messages(DEFAULT_HISTORY_LIMIT).await.unwrap().is_empty());
        assert!(listener.frames().await.is_empty());
    }

    #[tokio::test]
    async fn test_rejoin_during_slow_leave_keeps_participation() {
        let store = SqliteStore::new(connect_in_memory().await.unwrap());
        let chat = ChatService::new(Arc::new(SlowLeave {
            inner: store,
            delay: Duration::from_millis(200),
        }));
        let hub = Arc::new(Hub::new(chat.clone(), Duration::from_millis(200)));

        let first = hub.register(3, Arc::new(RecordingOutbound::default())).await;

        let leaving = {
            let hub = hub.clone();
            tokio::spawn(async move { hub.unregister(first).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        hub.register(3, Arc::new(RecordingOutbound::default())).await;
        assert!(leaving.await.unwrap());

        assert_eq!(hub.connected_users().await, vec![3]);
        assert!(chat.is_participant(3).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_churn() {
        let (hub, _) = hub().await;

        let mut tasks = Vec::new();
        for user_id in 0..20 {
            let hub = hub.clone();
            tasks.push(tokio::spawn(async move {
                let id = hub.register(user_id, Arc::new(RecordingOutbound::default())).await;
                hub.broadcast(&Frame::chat_message(format!("from {}", user_id))).await;
                hub.unregister(id).await
            }));
        }

        for task in tasks {
            assert!(task.await.unwrap());
        }
        assert_eq!(hub.connection_count().await, 0);
    }
}
