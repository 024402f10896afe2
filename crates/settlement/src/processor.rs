//! In-process stand-in for the external payment processor.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures_util::StreamExt;
use tokio::task::JoinHandle;

use crate::error::QueueError;
use crate::messages::{self, PaymentRequest, PaymentStatusUpdate};
use crate::queue::{SettlementQueue, Topic};

/// Simulated payment processor.
///
/// Consumes payment requests and answers each one with a `Processing`
/// update carrying a checkout URL, followed by `Confirmed`, or `Failed`
/// when configured to decline.
#[derive(Clone)]
pub struct SimulatedPaymentProcessor<Q: SettlementQueue> {
    queue: Q,
    checkout_base: String,
    decline: Arc<AtomicBool>,
    handled: Arc<AtomicU64>,
}

impl<Q: SettlementQueue + Clone + 'static> SimulatedPaymentProcessor<Q> {
    /// Creates a processor publishing checkout URLs under `checkout_base`.
    pub fn new(queue: Q, checkout_base: impl Into<String>) -> Self {
        Self {
            queue,
            checkout_base: checkout_base.into().trim_end_matches('/').to_string(),
            decline: Arc::new(AtomicBool::new(false)),
            handled: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Configures the processor to decline subsequent payments.
    pub fn set_decline(&self, decline: bool) {
        self.decline.store(decline, Ordering::SeqCst);
    }

    /// Returns the number of payment requests answered.
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::SeqCst)
    }

    /// Returns the checkout URL for a request.
    pub fn checkout_url(&self, request: &PaymentRequest) -> String {
        format!("{}/{}", self.checkout_base, request.order_id)
    }

    /// Subscribes to payment requests and answers them on a background task.
    ///
    /// The task ends when the queue closes.
    pub async fn start(self) -> Result<JoinHandle<()>, QueueError> {
        let mut requests = self.queue.subscribe(Topic::PaymentRequested).await?;

        Ok(tokio::spawn(async move {
            while let Some(payload) = requests.next().await {
                let request: PaymentRequest = match messages::decode(&payload) {
                    Ok(request) => request,
                    Err(e) => {
                        tracing::warn!(error = %e, "can't decode payment request");
                        continue;
                    }
                };
                if let Err(e) = self.answer(&request).await {
                    tracing::warn!(order_id = %request.order_id, error = %e, "can't answer payment request");
                }
            }
            tracing::info!("payment processor stopped");
        }))
    }

    async fn answer(&self, request: &PaymentRequest) -> Result<(), QueueError> {
        let processing = PaymentStatusUpdate::processing(request.order_id, self.checkout_url(request));
        self.send(&processing).await?;

        let outcome = if self.decline.load(Ordering::SeqCst) {
            PaymentStatusUpdate::failed(request.order_id)
        } else {
            PaymentStatusUpdate::confirmed(request.order_id)
        };
        self.send(&outcome).await?;

        self.handled.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(order_id = %request.order_id, status = %outcome.status, "payment answered");
        Ok(())
    }

    async fn send(&self, update: &PaymentStatusUpdate) -> Result<(), QueueError> {
        let payload = messages::encode(update).map_err(|e| QueueError::Unavailable(e.to_string()))?;
        self.queue.publish(Topic::PaymentStatus, payload).await
    }
}
