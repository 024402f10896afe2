//! The donation entity.

use chrono::{DateTime, Utc};
use common::{DonationId, PostId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::status::DonationStatus;

/// Smallest accepted donation, in minor currency units (50.00).
pub const MIN_DONATION_AMOUNT: u64 = 50 * 100;

/// Largest accepted donation, the biggest amount every store can hold.
pub const MAX_DONATION_AMOUNT: u64 = i64::MAX as u64;

/// A user-to-user pledge tracked through settlement.
///
/// Fields are private: `id`, participants and `amount` never change after
/// creation, and `status` only moves through [`Donation::apply_update`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Donation {
    id: DonationId,
    from: UserId,
    to: UserId,
    post: Option<PostId>,
    amount: u64,
    status: DonationStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Minimal `{id, amount}` view of a donation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationShort {
    pub id: DonationId,
    pub amount: u64,
}

/// The partial updates a store is allowed to apply to a donation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonationUpdate {
    /// Move the donation to a new settlement status.
    Status(DonationStatus),
}

impl Donation {
    /// Creates a new donation in the `New` state.
    ///
    /// An empty `post` is treated as "not tied to a post".
    pub fn new(
        from: UserId,
        to: UserId,
        post: Option<PostId>,
        amount: u64,
    ) -> Result<Self, DomainError> {
        if to.is_empty() {
            return Err(DomainError::RecipientRequired);
        }
        if amount < MIN_DONATION_AMOUNT {
            return Err(DomainError::AmountBelowMinimum {
                amount,
                minimum: MIN_DONATION_AMOUNT,
            });
        }
        if amount > MAX_DONATION_AMOUNT {
            return Err(DomainError::AmountTooLarge {
                amount,
                maximum: MAX_DONATION_AMOUNT,
            });
        }

        let now = Utc::now();
        Ok(Self {
            id: DonationId::new(),
            from,
            to,
            post: post.filter(|p| !p.is_empty()),
            amount,
            status: DonationStatus::New,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuilds a donation from persisted fields without re-validating.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: DonationId,
        from: UserId,
        to: UserId,
        post: Option<PostId>,
        amount: u64,
        status: DonationStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            from,
            to,
            post,
            amount,
            status,
            created_at,
            updated_at,
        }
    }

    /// Applies a partial update, refreshing `updated_at`.
    pub fn apply_update(
        &mut self,
        update: DonationUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        match update {
            DonationUpdate::Status(next) => {
                if !self.status.can_transition_to(next) {
                    return Err(DomainError::InvalidTransition {
                        from: self.status,
                        to: next,
                    });
                }
                self.status = next;
                self.updated_at = now;
            }
        }
        Ok(())
    }

    pub fn id(&self) -> DonationId {
        self.id
    }

    pub fn from(&self) -> &UserId {
        &self.from
    }

    pub fn to(&self) -> &UserId {
        &self.to
    }

    pub fn post(&self) -> Option<&PostId> {
        self.post.as_ref()
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn status(&self) -> DonationStatus {
        self.status
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == DonationStatus::Confirmed
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the `{id, amount}` projection.
    pub fn short(&self) -> DonationShort {
        DonationShort {
            id: self.id,
            amount: self.amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn donation(amount: u64) -> Result<Donation, DomainError> {
        Donation::new(UserId::from("u1"), UserId::from("u2"), None, amount)
    }

    #[test]
    fn test_new_donation_starts_new() {
        let d = donation(10_000).unwrap();
        assert_eq!(d.status(), DonationStatus::New);
        assert_eq!(d.created_at(), d.updated_at());
        assert_eq!(d.from().as_str(), "u1");
        assert_eq!(d.to().as_str(), "u2");
        assert_eq!(d.amount(), 10_000);
        assert!(d.post().is_none());
    }

    #[test]
    fn test_minimum_amount_is_accepted() {
        assert!(donation(MIN_DONATION_AMOUNT).is_ok());
    }

    #[test]
    fn test_amount_below_minimum_is_rejected() {
        let err = donation(4_999).unwrap_err();
        assert_eq!(
            err,
            DomainError::AmountBelowMinimum {
                amount: 4_999,
                minimum: 5_000
            }
        );
    }

    #[test]
    fn test_amount_above_maximum_is_rejected() {
        assert!(donation(MAX_DONATION_AMOUNT).is_ok());
        assert_eq!(
            donation(u64::MAX).unwrap_err(),
            DomainError::AmountTooLarge {
                amount: u64::MAX,
                maximum: MAX_DONATION_AMOUNT
            }
        );
    }

    #[test]
    fn test_recipient_is_required() {
        let err = Donation::new(UserId::from("u1"), UserId::default(), None, 10_000).unwrap_err();
        assert_eq!(err, DomainError::RecipientRequired);
    }

    #[test]
    fn test_anonymous_payer_is_allowed() {
        let d = Donation::new(UserId::default(), UserId::from("u2"), None, 10_000).unwrap();
        assert!(d.from().is_empty());
    }

    #[test]
    fn test_empty_post_is_dropped() {
        let d = Donation::new(
            UserId::from("u1"),
            UserId::from("u2"),
            Some(PostId::new("")),
            10_000,
        )
        .unwrap();
        assert!(d.post().is_none());

        let d = Donation::new(
            UserId::from("u1"),
            UserId::from("u2"),
            Some(PostId::new("p1")),
            10_000,
        )
        .unwrap();
        assert_eq!(d.post().map(PostId::as_str), Some("p1"));
    }

    #[test]
    fn test_status_update_refreshes_timestamp() {
        let mut d = donation(10_000).unwrap();
        let later = d.created_at() + chrono::Duration::seconds(5);

        d.apply_update(DonationUpdate::Status(DonationStatus::Pending), later)
            .unwrap();

        assert_eq!(d.status(), DonationStatus::Pending);
        assert_eq!(d.updated_at(), later);
        assert!(d.created_at() < d.updated_at());
    }

    #[test]
    fn test_illegal_update_leaves_donation_untouched() {
        let mut d = donation(10_000).unwrap();
        let before = d.clone();

        let err = d
            .apply_update(DonationUpdate::Status(DonationStatus::Confirmed), Utc::now())
            .unwrap_err();

        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: DonationStatus::New,
                to: DonationStatus::Confirmed
            }
        );
        assert_eq!(d, before);
    }

    #[test]
    fn test_repeated_settlement_is_rejected() {
        let mut d = donation(10_000).unwrap();
        let now = Utc::now();
        d.apply_update(DonationUpdate::Status(DonationStatus::Pending), now)
            .unwrap();
        d.apply_update(DonationUpdate::Status(DonationStatus::Confirmed), now)
            .unwrap();

        assert!(
            d.apply_update(DonationUpdate::Status(DonationStatus::Confirmed), now)
                .is_err()
        );
        assert!(
            d.apply_update(DonationUpdate::Status(DonationStatus::Failed), now)
                .is_err()
        );
        assert_eq!(d.status(), DonationStatus::Confirmed);
    }

    #[test]
    fn test_short_projection() {
        let d = donation(12_345).unwrap();
        let short = d.short();
        assert_eq!(short.id, d.id());
        assert_eq!(short.amount, 12_345);
    }

    #[test]
    fn test_donation_serializes_for_responses() {
        let d = donation(12_345).unwrap();
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["amount"], 12_345);
        assert_eq!(json["status"], "new");
        assert_eq!(json["id"], d.id().to_string());
    }
}
