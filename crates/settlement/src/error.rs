//! Settlement queue error types.

use thiserror::Error;

/// Errors that can occur when talking to the settlement queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The queue has been shut down.
    #[error("settlement queue is closed")]
    Closed,

    /// The transport rejected the operation.
    #[error("settlement queue unavailable: {0}")]
    Unavailable(String),
}
