//! Domain layer for the donation settlement system.
//!
//! This crate provides:
//! - [`Donation`] entity with its creation rules
//! - [`DonationStatus`] state machine driven by settlement outcomes
//! - [`DonationUpdate`], the closed set of partial updates a store may apply
//! - [`DonationShort`] projection used for bulk summaries

pub mod donation;
pub mod error;
pub mod status;

pub use common::{DonationId, PostId, UserId};
pub use donation::{Donation, DonationShort, DonationUpdate, MAX_DONATION_AMOUNT, MIN_DONATION_AMOUNT};
pub use error::DomainError;
pub use status::DonationStatus;
