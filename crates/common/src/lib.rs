//! Identifier types shared across the donation settlement crates.

pub mod types;

pub use types::{DonationId, PostId, UserId};
