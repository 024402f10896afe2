//! Background worker applying payment status updates to donations.

use std::sync::Arc;
use std::time::Instant;

use domain::{DonationStatus, DonationUpdate};
use donation_store::DonationStore;
use futures_util::StreamExt;
use settlement::{PaymentStatus, PaymentStatusUpdate, SettlementQueue, Subscription, Topic, messages};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::collaborators::{LedgerRecorder, NotificationKind, Notifier, PaymentNotification};
use crate::error::{ErrorKind, Result, ServiceError};
use crate::service::DonationService;

/// Applies payment status updates published by the payment processor.
///
/// For each update the donation status is advanced, confirmed donations are
/// recorded in the ledger, and the paying user is notified. Every failure
/// is logged and the update is skipped; the worker only stops when its
/// subscription ends.
pub struct Reconciler<S, Q, L, N>
where
    S: DonationStore,
    Q: SettlementQueue,
    L: LedgerRecorder,
    N: Notifier,
{
    service: Arc<DonationService<S, Q>>,
    ledger: L,
    notifier: N,
}

impl<S, Q, L, N> Reconciler<S, Q, L, N>
where
    S: DonationStore + 'static,
    Q: SettlementQueue + 'static,
    L: LedgerRecorder + 'static,
    N: Notifier + 'static,
{
    pub fn new(service: Arc<DonationService<S, Q>>, ledger: L, notifier: N) -> Self {
        Self {
            service,
            ledger,
            notifier,
        }
    }

    /// Subscribes to payment status updates and starts the worker.
    ///
    /// The subscription is taken before the task starts, so updates
    /// published after this returns are never missed.
    pub async fn spawn<P>(
        service: Arc<DonationService<S, Q>>,
        queue: &P,
        ledger: L,
        notifier: N,
    ) -> Result<ReconcilerHandle>
    where
        P: SettlementQueue + ?Sized,
    {
        let subscription = queue
            .subscribe(Topic::PaymentStatus)
            .await
            .map_err(ServiceError::Subscribe)?;

        let reconciler = Self::new(service, ledger, notifier);
        let task = tokio::spawn(reconciler.run(subscription));
        tracing::info!("settlement reconciler started");

        Ok(ReconcilerHandle { task })
    }

    async fn run(self, mut subscription: Subscription) {
        while let Some(payload) = subscription.next().await {
            self.handle(&payload).await;
        }
        tracing::info!("payment status subscription ended, reconciler stopped");
    }

    /// Handles one raw payment status message.
    pub async fn handle(&self, payload: &[u8]) {
        let started = Instant::now();
        metrics::counter!("settlement_events_total").increment(1);

        let update: PaymentStatusUpdate = match messages::decode(payload) {
            Ok(update) => update,
            Err(e) => {
                tracing::warn!(error = %e, "can't decode payment status update");
                skipped("malformed");
                return;
            }
        };

        let span = tracing::info_span!(
            "settlement_event",
            donation_id = %update.order_id,
            status = %update.status
        );
        self.apply(update).instrument(span).await;

        metrics::histogram!("settlement_event_duration_seconds")
            .record(started.elapsed().as_secs_f64());
    }

    async fn apply(&self, update: PaymentStatusUpdate) {
        let next = match update.status {
            PaymentStatus::Processing => DonationStatus::Pending,
            PaymentStatus::Confirmed => DonationStatus::Confirmed,
            PaymentStatus::Failed => DonationStatus::Failed,
            PaymentStatus::Unknown => {
                tracing::warn!("unhandled payment status");
                skipped("unknown_status");
                return;
            }
        };

        let donation = match self
            .service
            .update_donation(update.order_id, DonationUpdate::Status(next))
            .await
        {
            Ok(donation) => donation,
            Err(e) => {
                match e.kind() {
                    ErrorKind::NotFound => {
                        tracing::warn!(error = %e, "payment update for unknown donation");
                        skipped("not_found");
                    }
                    ErrorKind::Conflict => {
                        tracing::warn!(error = %e, "payment update out of order, ignored");
                        skipped("invalid_transition");
                    }
                    _ => {
                        tracing::error!(error = %e, "can't apply payment update");
                        skipped("store_error");
                    }
                }
                return;
            }
        };

        if next == DonationStatus::Confirmed {
            metrics::counter!("donations_confirmed_total").increment(1);
            if let Err(e) = self
                .ledger
                .record_donation(donation.from(), donation.to(), donation.short())
                .await
            {
                metrics::counter!("ledger_failures_total").increment(1);
                tracing::error!(error = %e, "can't record confirmed donation");
            }
        }

        let notification = PaymentNotification {
            id: donation.id(),
            status: update.status,
            url: match next {
                DonationStatus::Pending => update.url,
                _ => None,
            },
        };
        if let Err(e) = self
            .notifier
            .notify(NotificationKind::PaymentUpdate, notification, donation.from())
            .await
        {
            metrics::counter!("notifications_failed_total").increment(1);
            tracing::warn!(user = %donation.from(), error = %e, "can't notify payer");
        }

        tracing::info!(status = %donation.status(), "donation settlement updated");
    }
}

fn skipped(reason: &'static str) {
    metrics::counter!("settlement_events_skipped_total", "reason" => reason).increment(1);
}

/// Handle to a running [`Reconciler`] task.
#[derive(Debug)]
pub struct ReconcilerHandle {
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    /// Waits for the worker to finish draining its subscription.
    pub async fn join(self) -> Result<()> {
        match self.task.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(ServiceError::Internal(format!("reconciler task panicked: {e}"))),
        }
    }

    /// Stops the worker without draining.
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use common::{DonationId, UserId};
    use donation_store::InMemoryDonationStore;
    use settlement::InMemorySettlementQueue;

    use super::*;
    use crate::testing::{InMemoryLedger, InMemoryNotifier};

    type TestReconciler =
        Reconciler<InMemoryDonationStore, InMemorySettlementQueue, InMemoryLedger, InMemoryNotifier>;

    struct Fixture {
        service: Arc<DonationService<InMemoryDonationStore, InMemorySettlementQueue>>,
        ledger: InMemoryLedger,
        notifier: InMemoryNotifier,
        reconciler: TestReconciler,
    }

    fn fixture() -> Fixture {
        let service = Arc::new(DonationService::new(
            InMemoryDonationStore::new(),
            InMemorySettlementQueue::new(),
        ));
        let ledger = InMemoryLedger::new();
        let notifier = InMemoryNotifier::new();
        let reconciler = Reconciler::new(Arc::clone(&service), ledger.clone(), notifier.clone());
        Fixture {
            service,
            ledger,
            notifier,
            reconciler,
        }
    }

    async fn donate(fixture: &Fixture) -> DonationId {
        fixture
            .service
            .make_donation("alice".into(), "bob".into(), None, 10_000)
            .await
            .unwrap()
    }

    async fn deliver(fixture: &Fixture, update: &PaymentStatusUpdate) {
        fixture
            .reconciler
            .handle(&messages::encode(update).unwrap())
            .await;
    }

    async fn status_of(fixture: &Fixture, id: DonationId) -> DonationStatus {
        fixture.service.store().get_by_ids(&[id]).await.unwrap()[0].status()
    }

    #[tokio::test]
    async fn test_processing_moves_to_pending_and_forwards_url() {
        let f = fixture();
        let id = donate(&f).await;

        deliver(&f, &PaymentStatusUpdate::processing(id, "https://pay.test/x")).await;

        assert_eq!(status_of(&f, id).await, DonationStatus::Pending);
        let sent = f.notifier.sent_to(&"alice".into()).await;
        assert_eq!(
            sent,
            vec![PaymentNotification {
                id,
                status: PaymentStatus::Processing,
                url: Some("https://pay.test/x".into()),
            }]
        );
        assert!(f.ledger.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_confirmed_records_ledger_entry() {
        let f = fixture();
        let id = donate(&f).await;

        deliver(&f, &PaymentStatusUpdate::processing(id, "u")).await;
        deliver(&f, &PaymentStatusUpdate::confirmed(id)).await;

        assert_eq!(status_of(&f, id).await, DonationStatus::Confirmed);
        let entries = f.ledger.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].from, UserId::from("alice"));
        assert_eq!(entries[0].to, UserId::from("bob"));
        assert_eq!(entries[0].donation.amount, 10_000);
    }

    #[tokio::test]
    async fn test_unknown_status_is_ignored() {
        let f = fixture();
        let id = donate(&f).await;

        let payload = format!(r#"{{"orderID":"{id}","status":"refunded"}}"#);
        f.reconciler.handle(payload.as_bytes()).await;

        assert_eq!(status_of(&f, id).await, DonationStatus::New);
        assert!(f.notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_ignored() {
        let f = fixture();
        f.reconciler.handle(b"{not json").await;
        assert!(f.notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_for_unknown_donation_is_ignored() {
        let f = fixture();
        deliver(&f, &PaymentStatusUpdate::confirmed(DonationId::new())).await;
        assert!(f.ledger.entries().await.is_empty());
        assert!(f.notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_collaborator_failures_are_contained() {
        let f = fixture();
        let id = donate(&f).await;
        f.ledger.set_fail(true).await;
        f.notifier.set_fail(true).await;

        deliver(&f, &PaymentStatusUpdate::processing(id, "u")).await;
        deliver(&f, &PaymentStatusUpdate::confirmed(id)).await;

        assert_eq!(status_of(&f, id).await, DonationStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_spawn_fails_on_closed_queue() {
        let f = fixture();
        let queue = InMemorySettlementQueue::new();
        queue.close().await;

        let result = Reconciler::spawn(f.service, &queue, f.ledger, f.notifier).await;
        assert!(matches!(result, Err(ServiceError::Subscribe(_))));
    }

    #[tokio::test]
    async fn test_worker_stops_when_queue_closes() {
        let f = fixture();
        let queue = f.service.queue().clone();
        let handle = Reconciler::spawn(Arc::clone(&f.service), &queue, f.ledger, f.notifier)
            .await
            .unwrap();

        queue.close().await;
        handle.join().await.unwrap();
    }
}
