use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use domain::{Donation, DonationUpdate, DomainError};
use tokio::sync::RwLock;

use crate::{
    DonationFilter, DonationId, Participant, Result, StoreError, UserId, store::DonationStore,
};

/// In-memory donation store.
///
/// Provides the same interface as the PostgreSQL implementation. Each update
/// runs under the write lock, which gives the same per-record atomicity as a
/// find-and-update against the database.
#[derive(Clone, Default)]
pub struct InMemoryDonationStore {
    donations: Arc<RwLock<HashMap<DonationId, Donation>>>,
}

impl InMemoryDonationStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of donations stored.
    pub async fn donation_count(&self) -> usize {
        self.donations.read().await.len()
    }

    /// Clears all donations.
    pub async fn clear(&self) {
        self.donations.write().await.clear();
    }
}

#[async_trait]
impl DonationStore for InMemoryDonationStore {
    async fn create(&self, donation: &Donation) -> Result<()> {
        let mut store = self.donations.write().await;
        if store.contains_key(&donation.id()) {
            return Err(StoreError::Conflict(donation.id()));
        }
        store.insert(donation.id(), donation.clone());
        Ok(())
    }

    async fn get_by_recipient(&self, user: &UserId) -> Result<Vec<Donation>> {
        let store = self.donations.read().await;
        Ok(store
            .values()
            .filter(|d| d.to() == user)
            .cloned()
            .collect())
    }

    async fn get_by_ids(&self, ids: &[DonationId]) -> Result<Vec<Donation>> {
        let store = self.donations.read().await;
        Ok(ids.iter().filter_map(|id| store.get(id)).cloned().collect())
    }

    async fn count_confirmed(&self, user: &UserId) -> Result<u64> {
        let filter = DonationFilter::for_recipient(user.clone()).confirmed();
        let store = self.donations.read().await;
        Ok(store.values().filter(|d| filter.matches(d)).count() as u64)
    }

    async fn distinct_donors(
        &self,
        field: Participant,
        filter: DonationFilter,
    ) -> Result<Vec<UserId>> {
        let filter = filter.confirmed();
        let store = self.donations.read().await;
        let unique: BTreeSet<UserId> = store
            .values()
            .filter(|d| filter.matches(d))
            .map(|d| field.project(d).clone())
            .collect();
        Ok(unique.into_iter().collect())
    }

    async fn sum_confirmed_amount(&self, user: &UserId) -> Result<u64> {
        let filter = DonationFilter::for_recipient(user.clone()).confirmed();
        let store = self.donations.read().await;
        store
            .values()
            .filter(|d| filter.matches(d))
            .try_fold(0u64, |total, d| total.checked_add(d.amount()))
            .ok_or_else(|| StoreError::AmountOverflow(user.clone()))
    }

    async fn update_and_return(
        &self,
        id: DonationId,
        update: DonationUpdate,
    ) -> Result<Donation> {
        let mut store = self.donations.write().await;
        let donation = store.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        donation
            .apply_update(update, Utc::now())
            .map_err(|e| match e {
                DomainError::InvalidTransition { from, to } => {
                    StoreError::InvalidTransition { id, from, to }
                }
                other => StoreError::Encoding(other.to_string()),
            })?;

        Ok(donation.clone())
    }
}

#[cfg(test)]
mod tests {
    use domain::{DonationStatus, PostId};

    use super::*;
    use crate::store::DonationStoreExt;

    fn donation(from: &str, to: &str, post: Option<&str>, amount: u64) -> Donation {
        Donation::new(
            UserId::from(from),
            UserId::from(to),
            post.map(PostId::from),
            amount,
        )
        .unwrap()
    }

    async fn settle(store: &InMemoryDonationStore, id: DonationId, outcome: DonationStatus) {
        store
            .update_and_return(id, DonationUpdate::Status(DonationStatus::Pending))
            .await
            .unwrap();
        store
            .update_and_return(id, DonationUpdate::Status(outcome))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_and_find() {
        let store = InMemoryDonationStore::new();
        let d = donation("u1", "u2", None, 10_000);

        store.create(&d).await.unwrap();

        let found = store.find(d.id()).await.unwrap();
        assert_eq!(found, Some(d));
        assert_eq!(store.donation_count().await, 1);
    }

    #[tokio::test]
    async fn create_duplicate_conflicts() {
        let store = InMemoryDonationStore::new();
        let d = donation("u1", "u2", None, 10_000);
        store.create(&d).await.unwrap();

        let result = store.create(&d).await;
        assert!(matches!(result, Err(StoreError::Conflict(id)) if id == d.id()));
        assert_eq!(store.donation_count().await, 1);
    }

    #[tokio::test]
    async fn get_by_recipient_returns_all_statuses() {
        let store = InMemoryDonationStore::new();
        let d1 = donation("u1", "u2", None, 10_000);
        let d2 = donation("u3", "u2", None, 20_000);
        let other = donation("u1", "u9", None, 30_000);
        for d in [&d1, &d2, &other] {
            store.create(d).await.unwrap();
        }
        settle(&store, d1.id(), DonationStatus::Confirmed).await;

        let received = store.get_by_recipient(&UserId::from("u2")).await.unwrap();
        assert_eq!(received.len(), 2);

        let nobody = store.get_by_recipient(&UserId::from("u0")).await.unwrap();
        assert!(nobody.is_empty());
    }

    #[tokio::test]
    async fn get_by_ids_skips_unknown() {
        let store = InMemoryDonationStore::new();
        let d = donation("u1", "u2", None, 10_000);
        store.create(&d).await.unwrap();

        let found = store
            .get_by_ids(&[d.id(), DonationId::new()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), d.id());
    }

    #[tokio::test]
    async fn aggregates_only_count_confirmed() {
        let store = InMemoryDonationStore::new();
        let confirmed = donation("u1", "u2", Some("p1"), 10_000);
        let pending = donation("u3", "u2", Some("p1"), 20_000);
        let failed = donation("u4", "u2", Some("p1"), 40_000);
        let fresh = donation("u5", "u2", Some("p1"), 80_000);
        for d in [&confirmed, &pending, &failed, &fresh] {
            store.create(d).await.unwrap();
        }
        settle(&store, confirmed.id(), DonationStatus::Confirmed).await;
        settle(&store, failed.id(), DonationStatus::Failed).await;
        store
            .update_and_return(pending.id(), DonationUpdate::Status(DonationStatus::Pending))
            .await
            .unwrap();

        let recipient = UserId::from("u2");
        assert_eq!(store.count_confirmed(&recipient).await.unwrap(), 1);
        assert_eq!(store.sum_confirmed_amount(&recipient).await.unwrap(), 10_000);
        assert_eq!(
            store
                .distinct_donors(
                    Participant::From,
                    DonationFilter::for_recipient(recipient.clone())
                )
                .await
                .unwrap(),
            vec![UserId::from("u1")]
        );
        assert_eq!(
            store
                .distinct_donors(Participant::From, DonationFilter::for_post(PostId::from("p1")))
                .await
                .unwrap(),
            vec![UserId::from("u1")]
        );
    }

    #[tokio::test]
    async fn sum_is_zero_without_confirmed_donations() {
        let store = InMemoryDonationStore::new();
        store
            .create(&donation("u1", "u2", None, 10_000))
            .await
            .unwrap();

        let sum = store.sum_confirmed_amount(&UserId::from("u2")).await.unwrap();
        assert_eq!(sum, 0);
    }

    #[tokio::test]
    async fn sum_overflow_is_an_error() {
        let store = InMemoryDonationStore::new();
        for _ in 0..3 {
            let d = donation("u1", "u2", None, domain::MAX_DONATION_AMOUNT);
            store.create(&d).await.unwrap();
            settle(&store, d.id(), DonationStatus::Confirmed).await;
        }

        let err = store
            .sum_confirmed_amount(&UserId::from("u2"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AmountOverflow(ref user) if user.as_str() == "u2"));
    }

    #[tokio::test]
    async fn distinct_donors_deduplicates() {
        let store = InMemoryDonationStore::new();
        let d1 = donation("u1", "u2", None, 10_000);
        let d2 = donation("u1", "u2", None, 15_000);
        let d3 = donation("u1", "u3", None, 15_000);
        for d in [&d1, &d2, &d3] {
            store.create(d).await.unwrap();
            settle(&store, d.id(), DonationStatus::Confirmed).await;
        }

        let donors = store
            .distinct_donors(
                Participant::From,
                DonationFilter::for_recipient(UserId::from("u2")),
            )
            .await
            .unwrap();
        assert_eq!(donors, vec![UserId::from("u1")]);

        let recipients = store
            .distinct_donors(Participant::To, DonationFilter::for_donor(UserId::from("u1")))
            .await
            .unwrap();
        assert_eq!(recipients, vec![UserId::from("u2"), UserId::from("u3")]);
    }

    #[tokio::test]
    async fn update_returns_post_update_record() {
        let store = InMemoryDonationStore::new();
        let d = donation("u1", "u2", None, 10_000);
        store.create(&d).await.unwrap();

        let updated = store
            .update_and_return(d.id(), DonationUpdate::Status(DonationStatus::Pending))
            .await
            .unwrap();

        assert_eq!(updated.status(), DonationStatus::Pending);
        assert_eq!(updated.amount(), d.amount());
        assert!(updated.updated_at() >= d.updated_at());
        assert_eq!(store.find(d.id()).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn update_unknown_donation_is_not_found() {
        let store = InMemoryDonationStore::new();
        let id = DonationId::new();

        let result = store
            .update_and_return(id, DonationUpdate::Status(DonationStatus::Pending))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(missing)) if missing == id));
    }

    #[tokio::test]
    async fn illegal_transition_leaves_record_untouched() {
        let store = InMemoryDonationStore::new();
        let d = donation("u1", "u2", None, 10_000);
        store.create(&d).await.unwrap();
        settle(&store, d.id(), DonationStatus::Confirmed).await;
        let settled = store.find(d.id()).await.unwrap().unwrap();

        let result = store
            .update_and_return(d.id(), DonationUpdate::Status(DonationStatus::Failed))
            .await;

        assert!(matches!(
            result,
            Err(StoreError::InvalidTransition {
                from: DonationStatus::Confirmed,
                to: DonationStatus::Failed,
                ..
            })
        ));
        assert_eq!(store.find(d.id()).await.unwrap(), Some(settled));
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let store = InMemoryDonationStore::new();
        store
            .create(&donation("u1", "u2", None, 10_000))
            .await
            .unwrap();
        store.clear().await;
        assert_eq!(store.donation_count().await, 0);
    }
}
