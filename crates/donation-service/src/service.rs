//! Donation use cases.

use common::{DonationId, PostId, UserId};
use domain::{Donation, DonationShort, DonationUpdate};
use donation_store::{DonationFilter, DonationStore, Participant};
use settlement::{PaymentRequest, SettlementQueue, Topic, messages};

use crate::error::{Result, ServiceError};

/// Donation service coordinating the store and the settlement queue.
///
/// Creation persists a donation and asks the payment processor to collect
/// it. Settlement outcomes come back through [`DonationService::update_donation`],
/// usually driven by the [`crate::Reconciler`]. Every aggregate query sees
/// confirmed donations only.
pub struct DonationService<S: DonationStore, Q: SettlementQueue> {
    store: S,
    queue: Q,
}

impl<S: DonationStore, Q: SettlementQueue> DonationService<S, Q> {
    /// Creates a new donation service.
    pub fn new(store: S, queue: Q) -> Self {
        Self { store, queue }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns a reference to the settlement queue.
    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Records a new donation and requests its payment.
    ///
    /// If the payment request can't be published the donation stays stored
    /// in the `New` state and [`ServiceError::Publish`] is returned.
    #[tracing::instrument(skip(self), fields(donation_id))]
    pub async fn make_donation(
        &self,
        from: UserId,
        to: UserId,
        post: Option<PostId>,
        amount: u64,
    ) -> Result<DonationId> {
        let donation = Donation::new(from, to, post, amount).inspect_err(|e| {
            metrics::counter!("donations_rejected_total").increment(1);
            tracing::debug!(error = %e, "donation rejected");
        })?;
        let id = donation.id();
        tracing::Span::current().record("donation_id", tracing::field::display(id));

        self.store
            .create(&donation)
            .await
            .map_err(ServiceError::store("create donation"))?;
        metrics::counter!("donations_created_total").increment(1);

        let request = PaymentRequest::new(id, donation.from().clone(), donation.amount());
        let payload =
            messages::encode(&request).map_err(|e| ServiceError::Internal(e.to_string()))?;
        if let Err(e) = self.queue.publish(Topic::PaymentRequested, payload).await {
            metrics::counter!("payment_publish_failures_total").increment(1);
            tracing::error!(donation_id = %id, error = %e, "donation stored but payment request not published");
            return Err(ServiceError::Publish(e));
        }
        metrics::counter!("payment_requests_published_total").increment(1);

        tracing::info!(donation_id = %id, amount, "donation created");
        Ok(id)
    }

    /// Applies a settlement update and returns the updated donation.
    #[tracing::instrument(skip(self))]
    pub async fn update_donation(&self, id: DonationId, update: DonationUpdate) -> Result<Donation> {
        self.store
            .update_and_return(id, update)
            .await
            .map_err(ServiceError::store("update donation"))
    }

    /// Lists the distinct users with a confirmed donation to `user`.
    #[tracing::instrument(skip(self))]
    pub async fn donors_of_user(&self, user: &UserId) -> Result<Vec<UserId>> {
        require_user(user)?;
        self.store
            .distinct_donors(Participant::From, DonationFilter::for_recipient(user.clone()))
            .await
            .map_err(ServiceError::store("get donors of user"))
    }

    /// Lists the distinct users with a confirmed donation attributed to `post`.
    #[tracing::instrument(skip(self))]
    pub async fn donors_of_post(&self, post: &PostId) -> Result<Vec<UserId>> {
        if post.is_empty() {
            return Err(ServiceError::InvalidParams("post is required".into()));
        }
        self.store
            .distinct_donors(Participant::From, DonationFilter::for_post(post.clone()))
            .await
            .map_err(ServiceError::store("get donors of post"))
    }

    /// Lists the distinct users that received a confirmed donation from `user`.
    #[tracing::instrument(skip(self))]
    pub async fn recipients_donated_by(&self, user: &UserId) -> Result<Vec<UserId>> {
        require_user(user)?;
        self.store
            .distinct_donors(Participant::To, DonationFilter::for_donor(user.clone()))
            .await
            .map_err(ServiceError::store("get donated users"))
    }

    /// Sums the confirmed donations received by `user`.
    #[tracing::instrument(skip(self))]
    pub async fn total_confirmed_amount(&self, user: &UserId) -> Result<u64> {
        require_user(user)?;
        self.store
            .sum_confirmed_amount(user)
            .await
            .map_err(ServiceError::store("get amount of donations"))
    }

    /// Counts the confirmed donations received by `user`.
    #[tracing::instrument(skip(self))]
    pub async fn confirmed_count(&self, user: &UserId) -> Result<u64> {
        require_user(user)?;
        self.store
            .count_confirmed(user)
            .await
            .map_err(ServiceError::store("count donations"))
    }

    /// Returns `{id, amount}` summaries for the known donations among `ids`.
    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn donations_by_ids(&self, ids: &[DonationId]) -> Result<Vec<DonationShort>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let donations = self
            .store
            .get_by_ids(ids)
            .await
            .map_err(ServiceError::store("get donations by ids"))?;
        Ok(donations.iter().map(Donation::short).collect())
    }
}

fn require_user(user: &UserId) -> Result<()> {
    if user.is_empty() {
        return Err(ServiceError::InvalidParams("user is required".into()));
    }
    Ok(())
}
