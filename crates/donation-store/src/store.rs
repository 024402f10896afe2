use async_trait::async_trait;
use domain::{Donation, DonationUpdate};

use crate::{DonationFilter, DonationId, Participant, Result, UserId};

/// Core trait for donation persistence.
///
/// The store is a passive surface with no business rules beyond the status
/// edges enforced by [`DonationStore::update_and_return`]. All
/// implementations must be thread-safe (Send + Sync). Dropping a returned
/// future cancels the operation.
#[async_trait]
pub trait DonationStore: Send + Sync {
    /// Persists a new donation.
    ///
    /// Fails with `Conflict` if a donation with the same ID already exists.
    async fn create(&self, donation: &Donation) -> Result<()>;

    /// Retrieves every donation received by `user`, in any status.
    async fn get_by_recipient(&self, user: &UserId) -> Result<Vec<Donation>>;

    /// Retrieves donations by ID. Unknown IDs are skipped.
    async fn get_by_ids(&self, ids: &[DonationId]) -> Result<Vec<Donation>>;

    /// Counts confirmed donations received by `user`.
    async fn count_confirmed(&self, user: &UserId) -> Result<u64>;

    /// Returns the unique values of `field` among confirmed donations
    /// matching `filter`, sorted.
    async fn distinct_donors(
        &self,
        field: Participant,
        filter: DonationFilter,
    ) -> Result<Vec<UserId>>;

    /// Sums the amounts of confirmed donations received by `user`.
    ///
    /// Returns 0 when there are none.
    async fn sum_confirmed_amount(&self, user: &UserId) -> Result<u64>;

    /// Atomically applies `update` and returns the updated donation.
    ///
    /// Fails with `NotFound` if the donation doesn't exist and with
    /// `InvalidTransition` if the status edge is illegal, leaving the
    /// record untouched.
    async fn update_and_return(&self, id: DonationId, update: DonationUpdate)
    -> Result<Donation>;
}

/// Extension trait providing convenience methods for donation stores.
#[async_trait]
pub trait DonationStoreExt: DonationStore {
    /// Loads a single donation.
    async fn find(&self, id: DonationId) -> Result<Option<Donation>> {
        Ok(self.get_by_ids(&[id]).await?.into_iter().next())
    }
}

// Blanket implementation for all DonationStore implementations
impl<T: DonationStore + ?Sized> DonationStoreExt for T {}

#[async_trait]
impl<T: DonationStore + ?Sized> DonationStore for std::sync::Arc<T> {
    async fn create(&self, donation: &Donation) -> Result<()> {
        (**self).create(donation).await
    }

    async fn get_by_recipient(&self, user: &UserId) -> Result<Vec<Donation>> {
        (**self).get_by_recipient(user).await
    }

    async fn get_by_ids(&self, ids: &[DonationId]) -> Result<Vec<Donation>> {
        (**self).get_by_ids(ids).await
    }

    async fn count_confirmed(&self, user: &UserId) -> Result<u64> {
        (**self).count_confirmed(user).await
    }

    async fn distinct_donors(
        &self,
        field: Participant,
        filter: DonationFilter,
    ) -> Result<Vec<UserId>> {
        (**self).distinct_donors(field, filter).await
    }

    async fn sum_confirmed_amount(&self, user: &UserId) -> Result<u64> {
        (**self).sum_confirmed_amount(user).await
    }

    async fn update_and_return(
        &self,
        id: DonationId,
        update: DonationUpdate,
    ) -> Result<Donation> {
        (**self).update_and_return(id, update).await
    }
}
