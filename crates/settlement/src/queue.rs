//! Settlement queue contract.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::QueueError;

/// The two disjoint channels carried by the settlement queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Outbound: a donation asks the processor for a payment.
    PaymentRequested,
    /// Inbound: the processor reports a payment status change.
    PaymentStatus,
}

impl Topic {
    /// Returns the topic name used on the transport.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::PaymentRequested => "payments.requested",
            Topic::PaymentStatus => "payments.status",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stream of raw messages from one topic.
///
/// The stream ends when the queue is closed.
pub type Subscription = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

/// Ordered publish/subscribe channel between this service and the payment
/// processor.
#[async_trait]
pub trait SettlementQueue: Send + Sync {
    /// Publishes a raw message to `topic`.
    async fn publish(&self, topic: Topic, payload: Vec<u8>) -> Result<(), QueueError>;

    /// Subscribes to `topic`. Only messages published after this call are
    /// delivered.
    async fn subscribe(&self, topic: Topic) -> Result<Subscription, QueueError>;
}

#[async_trait]
impl<T: SettlementQueue + ?Sized> SettlementQueue for std::sync::Arc<T> {
    async fn publish(&self, topic: Topic, payload: Vec<u8>) -> Result<(), QueueError> {
        (**self).publish(topic, payload).await
    }

    async fn subscribe(&self, topic: Topic) -> Result<Subscription, QueueError> {
        (**self).subscribe(topic).await
    }
}
