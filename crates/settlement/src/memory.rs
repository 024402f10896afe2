//! In-process settlement queue.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures_util::stream;
use tokio::sync::{RwLock, broadcast};

use crate::error::QueueError;
use crate::queue::{SettlementQueue, Subscription, Topic};

/// Default number of undelivered messages buffered per topic.
pub const DEFAULT_CAPACITY: usize = 1024;

struct TopicChannel {
    sender: broadcast::Sender<Vec<u8>>,
    published: AtomicU64,
}

/// In-memory settlement queue with one broadcast channel per topic.
///
/// Delivery is ordered per topic. A subscriber that falls more than
/// `capacity` messages behind skips the oldest ones and logs how many were
/// lost. [`InMemorySettlementQueue::close`] ends every subscription.
#[derive(Clone)]
pub struct InMemorySettlementQueue {
    topics: Arc<RwLock<Option<HashMap<Topic, Arc<TopicChannel>>>>>,
}

impl InMemorySettlementQueue {
    /// Creates a queue with [`DEFAULT_CAPACITY`] per topic.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a queue buffering up to `capacity` messages per topic.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let topics = [Topic::PaymentRequested, Topic::PaymentStatus]
            .into_iter()
            .map(|topic| {
                let (sender, _) = broadcast::channel(capacity);
                let channel = TopicChannel {
                    sender,
                    published: AtomicU64::new(0),
                };
                (topic, Arc::new(channel))
            })
            .collect();

        Self {
            topics: Arc::new(RwLock::new(Some(topics))),
        }
    }

    /// Returns how many messages have been published to `topic`.
    pub async fn published(&self, topic: Topic) -> u64 {
        match self.topics.read().await.as_ref() {
            Some(topics) => topics
                .get(&topic)
                .map(|c| c.published.load(Ordering::Relaxed))
                .unwrap_or(0),
            None => 0,
        }
    }

    /// Returns true once [`InMemorySettlementQueue::close`] has been called.
    pub async fn is_closed(&self) -> bool {
        self.topics.read().await.is_none()
    }

    /// Shuts the queue down. Open subscriptions end after draining what was
    /// already published; further publishes fail with `Closed`.
    pub async fn close(&self) {
        if self.topics.write().await.take().is_some() {
            tracing::info!("settlement queue closed");
        }
    }

    async fn channel(&self, topic: Topic) -> Result<Arc<TopicChannel>, QueueError> {
        self.topics
            .read()
            .await
            .as_ref()
            .ok_or(QueueError::Closed)?
            .get(&topic)
            .cloned()
            .ok_or_else(|| QueueError::Unavailable(format!("unknown topic {topic}")))
    }
}

impl Default for InMemorySettlementQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettlementQueue for InMemorySettlementQueue {
    async fn publish(&self, topic: Topic, payload: Vec<u8>) -> Result<(), QueueError> {
        let channel = self.channel(topic).await?;

        // A send error only means nobody is listening right now.
        if channel.sender.send(payload).is_err() {
            tracing::debug!(%topic, "published message has no subscribers");
        }
        channel.published.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("settlement_messages_published_total", "topic" => topic.as_str())
            .increment(1);

        Ok(())
    }

    async fn subscribe(&self, topic: Topic) -> Result<Subscription, QueueError> {
        let receiver = self.channel(topic).await?.sender.subscribe();

        let messages = stream::unfold(receiver, move |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(message) => return Some((message, receiver)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(%topic, skipped, "subscriber lagged, messages dropped");
                        metrics::counter!("settlement_messages_dropped_total", "topic" => topic.as_str())
                            .increment(skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Ok(Box::pin(messages))
    }
}
