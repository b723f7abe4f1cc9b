//! Per-identity notification channel via Redis Pub/Sub.
//!
//! Every authenticated identity has its own channel; the WebSocket layer
//! subscribes to the caller's channel and forwards events. The channel is a
//! capability handed to the upload handler and the worker explicitly — no
//! ambient registry.

use std::future::Future;

use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::debug;

use vshare_models::{NotificationEvent, UserId};

use crate::error::QueueResult;

/// Envelope published to Redis: the target identity plus the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// The identity whose channel this goes to.
    pub identity: UserId,
    /// The client-facing event.
    pub event: NotificationEvent,
}

/// Something the workflow can emit notification events through.
///
/// The production implementation is [`EventChannel`]; worker tests use an
/// in-memory recorder.
pub trait EventSink: Send + Sync {
    fn emit(
        &self,
        identity: &UserId,
        event: NotificationEvent,
    ) -> impl Future<Output = QueueResult<()>> + Send;
}

/// Pub/sub channel for client notification events.
pub struct EventChannel {
    client: redis::Client,
}

impl EventChannel {
    /// Create a new event channel.
    pub fn new(redis_url: &str) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Channel name for an identity.
    pub fn channel_name(identity: &UserId) -> String {
        format!("vshare:events:{}", identity)
    }

    /// Publish an event to an identity's channel.
    pub async fn publish(&self, identity: &UserId, event: NotificationEvent) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let channel = Self::channel_name(identity);
        let payload = serde_json::to_string(&ChannelMessage {
            identity: identity.clone(),
            event,
        })?;

        debug!("Publishing event to {}", channel);
        conn.publish::<_, _, ()>(channel, payload).await?;

        Ok(())
    }

    /// Subscribe to an identity's channel. Returns a pinned stream of
    /// events that can be polled with `.next()`.
    pub async fn subscribe(
        &self,
        identity: &UserId,
    ) -> QueueResult<std::pin::Pin<Box<dyn futures_util::Stream<Item = ChannelMessage> + Send>>>
    {
        use futures_util::StreamExt;

        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(Self::channel_name(identity)).await?;

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let payload: String = msg.get_payload().ok()?;
            serde_json::from_str(&payload).ok()
        });

        Ok(Box::pin(stream))
    }
}

impl EventSink for EventChannel {
    async fn emit(&self, identity: &UserId, event: NotificationEvent) -> QueueResult<()> {
        self.publish(identity, event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_name_per_identity() {
        assert_eq!(
            EventChannel::channel_name(&UserId::from("u1")),
            "vshare:events:u1"
        );
    }
}
