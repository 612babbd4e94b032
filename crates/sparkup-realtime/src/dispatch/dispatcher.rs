//! Message dispatcher.
//!
//! A send goes `Received → Authorized → Persisted → FannedOut`, or stops at
//! `Rejected`. Authorization and fan-out read the same membership snapshot
//! from the cache, so a member removed mid-bucket can still send and
//! receive until the bucket rolls over. The `sender_id` in the frame is
//! trusted as-is.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use sparkup_cache::membership::MemberSnapshot;
use sparkup_cache::{MembershipCache, TimeBucket};
use sparkup_database::store::MessageStore;
use sparkup_entity::message::ChatMessage;

use crate::connection::handle::ConnectionHandle;
use crate::connection::manager::{ConnectionManager, DeliveryReport};
use crate::message::types::{InboundMessage, OutboundMessage, SendMessageRequest};
use crate::message::validator::{parse_inbound, validate_send};
use crate::metrics::RealtimeMetrics;

use super::error::DispatchError;

/// Outcome of a successful send.
#[derive(Debug, Clone)]
pub struct DispatchReceipt {
    /// The persisted message.
    pub message: ChatMessage,
    /// Members in the snapshot, sender included.
    pub recipients: usize,
    /// Members with no live connection.
    pub offline: usize,
    /// Per-connection delivery totals.
    pub delivery: DeliveryReport,
}

/// Validates, authorizes, persists, and fans out chat messages.
pub struct MessageDispatcher {
    members: MembershipCache,
    messages: Arc<dyn MessageStore>,
    connections: Arc<ConnectionManager>,
    metrics: Arc<RealtimeMetrics>,
}

impl std::fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDispatcher")
            .field("members", &self.members)
            .finish()
    }
}

impl MessageDispatcher {
    /// Creates a dispatcher.
    pub fn new(
        members: MembershipCache,
        messages: Arc<dyn MessageStore>,
        connections: Arc<ConnectionManager>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            members,
            messages,
            connections,
            metrics,
        }
    }

    /// Handle one inbound text frame from `origin`.
    ///
    /// Any failure is answered with an `error` frame on the originating
    /// connection only.
    pub async fn handle_frame(&self, origin: &ConnectionHandle, raw: &str) {
        self.metrics.frame_received();

        let result = match parse_inbound(raw) {
            Ok(InboundMessage::SendMessage(request)) => self.send_message(request).await,
            Err(e) => Err(e),
        };

        if let Err(err) = result {
            self.metrics.message_rejected();
            match &err {
                DispatchError::MissingFields | DispatchError::NotAuthorized => {
                    debug!(conn_id = %origin.id, reason = %err, "Send rejected");
                }
                DispatchError::Malformed(source) => {
                    warn!(conn_id = %origin.id, error = %source, "Malformed frame");
                }
                DispatchError::PersistFailed(source) | DispatchError::MembershipUnavailable(source) => {
                    error!(conn_id = %origin.id, error = %source, reason = %err, "Send failed");
                }
            }
            let reply = OutboundMessage::error(err.to_string());
            if let Err(e) = self.connections.send_to_connection(origin, &reply) {
                warn!(conn_id = %origin.id, error = %e, "Could not deliver error frame");
            }
        }
    }

    /// Run one send through validation, authorization, persistence, and
    /// fan-out.
    pub async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<DispatchReceipt, DispatchError> {
        self.send_message_at(request, self.members.current_bucket()).await
    }

    /// Same as [`send_message`](Self::send_message), reading membership
    /// from the snapshot of `bucket`.
    pub async fn send_message_at(
        &self,
        request: SendMessageRequest,
        bucket: TimeBucket,
    ) -> Result<DispatchReceipt, DispatchError> {
        let new_message = validate_send(request)?;
        let post_id = new_message.post_id;
        let sender_id = new_message.sender_id;

        let snapshot = self
            .members
            .get_members(post_id, bucket)
            .await
            .map_err(DispatchError::MembershipUnavailable)?;

        let Some(sender) = snapshot.iter().find(|m| m.user_id == sender_id) else {
            warn!(post_id = %post_id, sender_id = %sender_id, "Sender is not a room member");
            return Err(DispatchError::NotAuthorized);
        };
        let sender_name = sender.display_name.clone();

        let stored = self.messages.insert_message(new_message).await.map_err(|e| {
            self.metrics.persist_failed();
            DispatchError::PersistFailed(e)
        })?;

        let (delivery, offline) = self.fan_out(&stored, sender_name, &snapshot);
        self.metrics.message_dispatched();

        info!(
            message_id = %stored.id,
            post_id = %post_id,
            recipients = snapshot.len(),
            offline,
            delivered = delivery.delivered,
            failed = delivery.failed,
            "Message sent"
        );

        Ok(DispatchReceipt {
            message: stored,
            recipients: snapshot.len(),
            offline,
            delivery,
        })
    }

    /// Deliver `new_message` to the personal group of every online member.
    /// Failures are counted and logged, never retried.
    fn fan_out(
        &self,
        message: &ChatMessage,
        sender_name: String,
        snapshot: &MemberSnapshot,
    ) -> (DeliveryReport, usize) {
        let frame = OutboundMessage::NewMessage {
            id: message.id,
            post_id: message.post_id,
            sender_id: message.sender_id,
            sender_name,
            content: message.content.clone(),
            created_at: message.created_at,
        };
        let frame = match serde_json::to_string(&frame) {
            Ok(frame) => frame,
            Err(e) => {
                error!(message_id = %message.id, error = %e, "Failed to serialize new_message");
                return (DeliveryReport::default(), snapshot.len());
            }
        };

        let mut report = DeliveryReport::default();
        let mut offline = 0;
        for member in snapshot.iter() {
            if !self.connections.is_user_connected(member.user_id) {
                offline += 1;
                continue;
            }
            report += self.connections.deliver_to_user(member.user_id, &frame);
        }
        (report, offline)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{TimeZone, Utc};
    use serde_json::Value;
    use tokio::sync::mpsc;

    use sparkup_core::config::{MembershipCacheConfig, RealtimeConfig};
    use sparkup_core::types::{PostId, UserId};
    use sparkup_database::memory::MemoryChatStore;
    use sparkup_database::store::{MessageStore, RoomStore};

    use crate::connection::pool::ConnectionPool;
    use crate::session::RoomSessionManager;

    use super::*;

    struct Fixture {
        store: Arc<MemoryChatStore>,
        connections: Arc<ConnectionManager>,
        dispatcher: MessageDispatcher,
        metrics: Arc<RealtimeMetrics>,
    }

    async fn fixture() -> Fixture {
        fixture_with(RealtimeConfig::default()).await
    }

    async fn fixture_with(config: RealtimeConfig) -> Fixture {
        let store = Arc::new(MemoryChatStore::new());
        store.add_user(UserId(1), Some("ana")).await;
        store.add_user(UserId(2), Some("ben")).await;
        store.add_user(UserId(3), Some("cy")).await;
        store.create_room(PostId(42), "Sunday hike", UserId(1)).await.unwrap();
        store.add_member(PostId(42), UserId(2)).await.unwrap();

        let metrics = Arc::new(RealtimeMetrics::new());
        let pool = Arc::new(ConnectionPool::new());
        let sessions = Arc::new(RoomSessionManager::new(pool.clone()));
        let connections = Arc::new(ConnectionManager::new(
            config,
            pool,
            sessions,
            metrics.clone(),
        ));
        let cache = MembershipCache::new(&MembershipCacheConfig::default(), store.clone());
        let dispatcher =
            MessageDispatcher::new(cache, store.clone(), connections.clone(), metrics.clone());

        Fixture {
            store,
            connections,
            dispatcher,
            metrics,
        }
    }

    fn frame(post: i64, sender: i64, content: &str) -> String {
        serde_json::json!({
            "type": "send_message",
            "post_id": post,
            "sender_id": sender,
            "content": content,
        })
        .to_string()
    }

    fn next_json(rx: &mut mpsc::Receiver<String>) -> Value {
        let raw = rx.try_recv().expect("expected a frame");
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_member_message_reaches_every_online_member() {
        let fx = fixture().await;
        let (a, mut rx_a) = fx.connections.register(UserId(1), None).await;
        let (_b, mut rx_b) = fx.connections.register(UserId(2), None).await;
        let (_c, mut rx_c) = fx.connections.register(UserId(3), None).await;

        fx.dispatcher.handle_frame(&a, &frame(42, 1, "hi")).await;

        let to_b = next_json(&mut rx_b);
        assert_eq!(to_b["type"], "new_message");
        assert_eq!(to_b["content"], "hi");
        assert_eq!(to_b["sender_id"], 1);
        assert_eq!(to_b["sender_name"], "ana");
        assert_eq!(to_b["post_id"], 42);

        let to_a = next_json(&mut rx_a);
        assert_eq!(to_a, to_b);
        assert!(rx_c.try_recv().is_err());

        let page = fx.store.message_page(PostId(42), None, 10).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].read_users, BTreeSet::from([UserId(1)]));
    }

    #[tokio::test]
    async fn test_offline_members_are_skipped() {
        let fx = fixture().await;
        let receipt = fx
            .dispatcher
            .send_message(SendMessageRequest {
                post_id: Some(PostId(42)),
                sender_id: Some(UserId(1)),
                content: Some("anyone?".into()),
            })
            .await
            .unwrap();
        assert_eq!(receipt.recipients, 2);
        assert_eq!(receipt.offline, 2);
        assert_eq!(receipt.delivery.delivered, 0);
        assert_eq!(fx.store.message_count(PostId(42)).await, 1);
    }

    #[tokio::test]
    async fn test_non_member_rejected_and_nothing_persisted() {
        let fx = fixture().await;
        let (c, mut rx_c) = fx.connections.register(UserId(3), None).await;
        let (_b, mut rx_b) = fx.connections.register(UserId(2), None).await;

        fx.dispatcher.handle_frame(&c, &frame(42, 3, "let me in")).await;

        let reply = next_json(&mut rx_c);
        assert_eq!(reply["type"], "error");
        assert_eq!(
            reply["message"],
            "Not authorized to send messages in this chat room"
        );
        assert!(rx_b.try_recv().is_err());
        assert_eq!(fx.store.message_count(PostId(42)).await, 0);
        assert_eq!(fx.metrics.snapshot().messages_rejected, 1);
    }

    #[tokio::test]
    async fn test_missing_fields_skip_the_store() {
        let fx = fixture().await;
        let (a, mut rx_a) = fx.connections.register(UserId(1), None).await;

        let raw = r#"{"type":"send_message","post_id":42,"sender_id":1,"content":""}"#;
        fx.dispatcher.handle_frame(&a, raw).await;

        assert_eq!(next_json(&mut rx_a)["message"], "Missing required fields");
        assert_eq!(fx.store.member_queries(), 0);
    }

    #[tokio::test]
    async fn test_persist_failure_reports_and_does_not_fan_out() {
        let fx = fixture().await;
        let (a, mut rx_a) = fx.connections.register(UserId(1), None).await;
        let (_b, mut rx_b) = fx.connections.register(UserId(2), None).await;

        fx.store.set_fail_writes(true);
        fx.dispatcher.handle_frame(&a, &frame(42, 1, "hi")).await;

        assert_eq!(next_json(&mut rx_a)["message"], "Failed to save message");
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_err());
        assert_eq!(fx.metrics.snapshot().persist_failures, 1);
    }

    #[tokio::test]
    async fn test_malformed_frames() {
        let fx = fixture().await;
        let (a, mut rx_a) = fx.connections.register(UserId(1), None).await;

        fx.dispatcher.handle_frame(&a, "{not json").await;
        assert_eq!(next_json(&mut rx_a)["message"], "Failed to process message");

        fx.dispatcher.handle_frame(&a, r#"{"type":"typing"}"#).await;
        assert_eq!(next_json(&mut rx_a)["message"], "Failed to process message");
    }

    #[tokio::test]
    async fn test_full_recipient_buffer_does_not_fail_the_send() {
        let fx = fixture_with(RealtimeConfig {
            max_connections_per_user: 3,
            channel_buffer_size: 1,
        })
        .await;
        let (a, mut rx_a) = fx.connections.register(UserId(1), None).await;
        let (b, mut rx_b) = fx.connections.register(UserId(2), None).await;
        b.send("backlog".into()).unwrap();

        fx.dispatcher.handle_frame(&a, &frame(42, 1, "hi")).await;

        let to_a = next_json(&mut rx_a);
        assert_eq!(to_a["type"], "new_message");
        assert_eq!(to_a["content"], "hi");
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().unwrap(), "backlog");
        assert!(rx_b.try_recv().is_err());
        assert_eq!(fx.store.message_count(PostId(42)).await, 1);
        assert_eq!(fx.metrics.snapshot().messages_rejected, 0);
    }

    #[tokio::test]
    async fn test_failed_delivery_is_counted_in_receipt() {
        let fx = fixture().await;
        let (_a, mut rx_a) = fx.connections.register(UserId(1), None).await;
        let (_b, rx_b) = fx.connections.register(UserId(2), None).await;
        drop(rx_b);

        let receipt = fx
            .dispatcher
            .send_message(SendMessageRequest {
                post_id: Some(PostId(42)),
                sender_id: Some(UserId(1)),
                content: Some("hi".into()),
            })
            .await
            .unwrap();

        assert_eq!(receipt.recipients, 2);
        assert_eq!(receipt.offline, 0);
        assert_eq!(receipt.delivery.delivered, 1);
        assert_eq!(receipt.delivery.failed, 1);
        assert_eq!(next_json(&mut rx_a)["type"], "new_message");
        assert!(rx_a.try_recv().is_err());
        assert_eq!(fx.store.message_count(PostId(42)).await, 1);
    }

    #[tokio::test]
    async fn test_cached_snapshot_authorizes_within_bucket() {
        let fx = fixture().await;
        let send = |sender: i64| SendMessageRequest {
            post_id: Some(PostId(42)),
            sender_id: Some(UserId(sender)),
            content: Some("hello".into()),
        };
        let at = |minute: u32| {
            TimeBucket::at(Utc.with_ymd_and_hms(2024, 1, 15, 10, minute, 0).unwrap(), 5)
        };

        assert!(fx.dispatcher.send_message_at(send(1), at(35)).await.is_ok());
        fx.store.add_member(PostId(42), UserId(3)).await.unwrap();

        let stale = fx.dispatcher.send_message_at(send(3), at(38)).await;
        assert!(matches!(stale, Err(DispatchError::NotAuthorized)));
        assert_eq!(fx.store.member_queries(), 1);

        let fresh = fx.dispatcher.send_message_at(send(3), at(40)).await.unwrap();
        assert_eq!(fresh.recipients, 3);
        assert_eq!(fx.store.member_queries(), 2);
        assert_eq!(fx.store.message_count(PostId(42)).await, 2);
    }

    #[tokio::test]
    async fn test_removed_member_keeps_sending_until_rollover() {
        let fx = fixture().await;
        let send = SendMessageRequest {
            post_id: Some(PostId(42)),
            sender_id: Some(UserId(2)),
            content: Some("still here".into()),
        };
        let at = |minute: u32| {
            TimeBucket::at(Utc.with_ymd_and_hms(2024, 1, 15, 10, minute, 0).unwrap(), 5)
        };

        fx.dispatcher.send_message_at(send.clone(), at(10)).await.unwrap();
        fx.store.remove_member(PostId(42), UserId(2)).await.unwrap();

        assert!(fx.dispatcher.send_message_at(send.clone(), at(14)).await.is_ok());
        let after = fx.dispatcher.send_message_at(send, at(15)).await;
        assert!(matches!(after, Err(DispatchError::NotAuthorized)));
    }
}
