//! Settlement plumbing between the donation service and the payment processor.
//!
//! This crate provides:
//! - [`SettlementQueue`] trait: ordered publish/subscribe over two topics
//! - [`InMemorySettlementQueue`] backed by `tokio::sync::broadcast`
//! - Wire messages for payment requests and payment status updates
//! - [`SimulatedPaymentProcessor`] that answers payment requests in-process

pub mod error;
pub mod memory;
pub mod messages;
pub mod processor;
pub mod queue;

pub use error::QueueError;
pub use memory::InMemorySettlementQueue;
pub use messages::{PaymentRequest, PaymentStatus, PaymentStatusUpdate};
pub use processor::SimulatedPaymentProcessor;
pub use queue::{SettlementQueue, Subscription, Topic};
