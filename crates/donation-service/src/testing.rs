//! Recording collaborators for tests.

use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;
use domain::DonationShort;
use tokio::sync::RwLock;

use crate::collaborators::{
    CollaboratorError, LedgerRecorder, NotificationKind, Notifier, PaymentNotification,
};

/// A donation recorded by [`InMemoryLedger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub from: UserId,
    pub to: UserId,
    pub donation: DonationShort,
}

#[derive(Debug, Default)]
struct LedgerState {
    entries: Vec<LedgerEntry>,
    fail: bool,
}

/// In-memory ledger that keeps every recorded donation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the ledger to reject subsequent records.
    pub async fn set_fail(&self, fail: bool) {
        self.state.write().await.fail = fail;
    }

    pub async fn entries(&self) -> Vec<LedgerEntry> {
        self.state.read().await.entries.clone()
    }
}

#[async_trait]
impl LedgerRecorder for InMemoryLedger {
    async fn record_donation(
        &self,
        from: &UserId,
        to: &UserId,
        donation: DonationShort,
    ) -> Result<(), CollaboratorError> {
        let mut state = self.state.write().await;
        if state.fail {
            return Err(CollaboratorError::Unavailable("ledger is down".into()));
        }
        state.entries.push(LedgerEntry {
            from: from.clone(),
            to: to.clone(),
            donation,
        });
        Ok(())
    }
}

/// A notification delivered through [`InMemoryNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub kind: NotificationKind,
    pub payload: PaymentNotification,
    pub user: UserId,
}

#[derive(Debug, Default)]
struct NotifierState {
    sent: Vec<SentNotification>,
    fail: bool,
}

/// In-memory notifier that keeps every notification it was asked to send.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<NotifierState>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the notifier to reject subsequent notifications.
    pub async fn set_fail(&self, fail: bool) {
        self.state.write().await.fail = fail;
    }

    pub async fn sent(&self) -> Vec<SentNotification> {
        self.state.read().await.sent.clone()
    }

    /// Returns the notifications addressed to `user`.
    pub async fn sent_to(&self, user: &UserId) -> Vec<PaymentNotification> {
        self.state
            .read()
            .await
            .sent
            .iter()
            .filter(|n| &n.user == user)
            .map(|n| n.payload.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(
        &self,
        kind: NotificationKind,
        payload: PaymentNotification,
        user: &UserId,
    ) -> Result<(), CollaboratorError> {
        let mut state = self.state.write().await;
        if state.fail {
            return Err(CollaboratorError::Unavailable("notifier is down".into()));
        }
        tracing::debug!(%user, donation_id = %payload.id, status = %payload.status, "notification sent");
        state.sent.push(SentNotification {
            kind,
            payload,
            user: user.clone(),
        });
        Ok(())
    }
}
