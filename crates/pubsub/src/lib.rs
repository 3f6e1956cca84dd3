//! Redis Pub/Sub for cross-instance event distribution.
//!
//! When several server instances run behind a load balancer, a message
//! committed on one instance must still reach WebSocket sessions held by
//! the others. Every instance publishes committed events to a shared Redis
//! channel and forwards what it receives into its local fan-out hub.

#![allow(missing_docs)]

use std::sync::Arc;

use accord_common::{AppError, AppResult, MessageEvent};
use accord_core::MessageEventPublisher;
use async_trait::async_trait;
use fred::clients::{Client, SubscriberClient};
use fred::error::{Error as RedisError, ErrorKind as RedisErrorKind};
use fred::interfaces::{ClientLike, EventInterface, PubsubInterface};
use fred::types::config::Config as RedisConfig;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Pub/Sub channel names, derived from the configured key prefix.
pub mod channels {
    /// Message events for all topics.
    #[must_use]
    pub fn topics(prefix: &str) -> String {
        format!("{prefix}:topics")
    }
}

/// Redis Pub/Sub manager for event distribution.
#[derive(Clone)]
pub struct RedisPubSub {
    publisher: Client,
    subscriber: SubscriberClient,
    /// Channel carrying message events for all topics.
    topic_channel: String,
    /// Local broadcast channel for events received from Redis.
    local_tx: broadcast::Sender<MessageEvent>,
}

impl RedisPubSub {
    /// Create a new Redis Pub/Sub manager.
    pub async fn new(redis_url: &str, prefix: &str) -> Result<Self, RedisError> {
        let config = RedisConfig::from_url(redis_url)?;

        let publisher = Client::new(config.clone(), None, None, None);
        publisher.init().await?;

        let subscriber = SubscriberClient::new(config, None, None, None);
        subscriber.init().await?;

        let (local_tx, _) = broadcast::channel(1000);

        info!("Redis Pub/Sub initialized");

        Ok(Self {
            publisher,
            subscriber,
            topic_channel: channels::topics(prefix),
            local_tx,
        })
    }

    /// Subscribe to the topics channel and start the event loop.
    pub async fn start(&self) -> Result<(), RedisError> {
        self.subscriber.subscribe(self.topic_channel.as_str()).await?;

        info!("Subscribed to Redis Pub/Sub channels");

        let local_tx = self.local_tx.clone();
        let mut message_stream = self.subscriber.message_rx();

        tokio::spawn(async move {
            while let Ok(message) = message_stream.recv().await {
                if let Some(payload) = message.value.as_string() {
                    match serde_json::from_str::<MessageEvent>(&payload) {
                        Ok(event) => {
                            debug!(topic = %event.topic_id(), "Received Pub/Sub event");
                            if local_tx.send(event).is_err() {
                                warn!("No local subscribers for Pub/Sub event");
                            }
                        }
                        Err(e) => {
                            warn!("Failed to parse Pub/Sub message: {}", e);
                        }
                    }
                }
            }
            info!("Pub/Sub message stream ended");
        });

        Ok(())
    }

    /// Publish an event to the shared topics channel.
    pub async fn publish_event(&self, event: &MessageEvent) -> Result<(), RedisError> {
        let payload = serde_json::to_string(event).map_err(|e| {
            RedisError::new(
                RedisErrorKind::InvalidArgument,
                format!("Serialization error: {e}"),
            )
        })?;
        let _: () = self
            .publisher
            .publish(self.topic_channel.as_str(), payload)
            .await?;
        debug!(topic = %event.topic_id(), "Published Pub/Sub event");
        Ok(())
    }

    /// Get a receiver for local broadcast events.
    #[must_use]
    pub fn subscribe_local(&self) -> broadcast::Receiver<MessageEvent> {
        self.local_tx.subscribe()
    }

    /// Get the number of local subscribers.
    #[must_use]
    pub fn local_subscriber_count(&self) -> usize {
        self.local_tx.receiver_count()
    }

    /// Shutdown the Pub/Sub manager.
    pub async fn shutdown(&self) -> Result<(), RedisError> {
        self.subscriber.quit().await?;
        self.publisher.quit().await?;
        info!("Redis Pub/Sub shutdown");
        Ok(())
    }
}

#[async_trait]
impl MessageEventPublisher for RedisPubSub {
    async fn publish(&self, event: MessageEvent) -> AppResult<()> {
        self.publish_event(&event)
            .await
            .map_err(|e| AppError::Redis(e.to_string()))
    }
}

/// Bridge between Redis Pub/Sub and the local fan-out hub.
pub struct PubSubBridge {
    pubsub: Arc<RedisPubSub>,
}

impl PubSubBridge {
    /// Create a new bridge.
    #[must_use]
    pub const fn new(pubsub: Arc<RedisPubSub>) -> Self {
        Self { pubsub }
    }

    /// Start the bridge, forwarding events from Redis into the callback.
    ///
    /// The callback is the seam towards the local hub, so this crate does
    /// not need to know the hub's concrete type.
    pub fn start<F>(&self, on_event: F)
    where
        F: Fn(MessageEvent) + Send + Sync + 'static,
    {
        let mut rx = self.pubsub.subscribe_local();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => on_event(event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Pub/Sub bridge lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Pub/Sub bridge channel closed");
                        break;
                    }
                }
            }
        });
    }
}
