//! Donation use cases and payment settlement.
//!
//! This crate provides:
//! - [`DonationService`]: creation, settlement updates and confirmed-only queries
//! - [`Reconciler`]: background worker applying payment status updates
//! - [`LedgerRecorder`] and [`Notifier`]: collaborators told about settled payments

pub mod collaborators;
pub mod error;
pub mod reconciler;
pub mod service;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use collaborators::{
    CollaboratorError, LedgerRecorder, NotificationKind, Notifier, PaymentNotification,
    TracingLedger, TracingNotifier,
};
pub use error::{ErrorKind, Result, ServiceError};
pub use reconciler::{Reconciler, ReconcilerHandle};
pub use service::DonationService;
