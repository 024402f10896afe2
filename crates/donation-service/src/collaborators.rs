//! Collaborators told about settled payments, with log-only implementations.

use std::sync::Arc;

use async_trait::async_trait;
use common::{DonationId, UserId};
use domain::DonationShort;
use serde::{Deserialize, Serialize};
use settlement::PaymentStatus;
use thiserror::Error;

/// Failure reported by a collaborator. Never escalated by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Records confirmed donations as user-to-user events.
#[async_trait]
pub trait LedgerRecorder: Send + Sync {
    async fn record_donation(
        &self,
        from: &UserId,
        to: &UserId,
        donation: DonationShort,
    ) -> Result<(), CollaboratorError>;
}

/// The category of a user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A payment the user started changed status.
    PaymentUpdate,
}

/// Payload sent to the paying user when their payment changes status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub id: DonationId,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Pushes notifications to users.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        kind: NotificationKind,
        payload: PaymentNotification,
        user: &UserId,
    ) -> Result<(), CollaboratorError>;
}

#[async_trait]
impl<T: LedgerRecorder + ?Sized> LedgerRecorder for Arc<T> {
    async fn record_donation(
        &self,
        from: &UserId,
        to: &UserId,
        donation: DonationShort,
    ) -> Result<(), CollaboratorError> {
        (**self).record_donation(from, to, donation).await
    }
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    async fn notify(
        &self,
        kind: NotificationKind,
        payload: PaymentNotification,
        user: &UserId,
    ) -> Result<(), CollaboratorError> {
        (**self).notify(kind, payload, user).await
    }
}

/// Ledger that only logs confirmed donations.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLedger;

#[async_trait]
impl LedgerRecorder for TracingLedger {
    async fn record_donation(
        &self,
        from: &UserId,
        to: &UserId,
        donation: DonationShort,
    ) -> Result<(), CollaboratorError> {
        tracing::info!(
            %from,
            %to,
            donation_id = %donation.id,
            amount = donation.amount,
            "donation recorded"
        );
        Ok(())
    }
}

/// Notifier that only logs the notifications it is asked to send.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(
        &self,
        kind: NotificationKind,
        payload: PaymentNotification,
        user: &UserId,
    ) -> Result<(), CollaboratorError> {
        tracing::info!(
            %user,
            ?kind,
            donation_id = %payload.id,
            status = %payload.status,
            url = payload.url.as_deref(),
            "payment notification"
        );
        Ok(())
    }
}
