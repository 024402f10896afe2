use domain::DonationStatus;
use thiserror::Error;

use crate::{DonationId, UserId};

/// Errors that can occur when interacting with the donation store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A donation with this identifier already exists.
    #[error("Donation already exists: {0}")]
    Conflict(DonationId),

    /// The donation was not found.
    #[error("Donation not found: {0}")]
    NotFound(DonationId),

    /// The update would move the donation along an illegal status edge.
    #[error("Invalid status transition for donation {id}: {from} -> {to}")]
    InvalidTransition {
        id: DonationId,
        from: DonationStatus,
        to: DonationStatus,
    },

    /// An aggregate over a user's donations does not fit in the result type.
    #[error("Amount total overflows for user {0}")]
    AmountOverflow(UserId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A value could not be mapped to or from its stored form.
    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Result type for donation store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
