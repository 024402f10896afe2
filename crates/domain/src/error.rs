//! Domain error types.

use thiserror::Error;

use crate::status::DonationStatus;

/// Errors raised by donation business rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The receiving user is missing.
    #[error("recipient is required")]
    RecipientRequired,

    /// The amount is under the minimum accepted donation.
    #[error("amount {amount} is less than minimum available value {minimum}")]
    AmountBelowMinimum { amount: u64, minimum: u64 },

    /// The amount exceeds what a donation may carry.
    #[error("amount {amount} is greater than maximum available value {maximum}")]
    AmountTooLarge { amount: u64, maximum: u64 },

    /// The requested status change is not an edge of the state machine.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: DonationStatus,
        to: DonationStatus,
    },
}
