use domain::{Donation, DonationStatus};

use crate::{PostId, UserId};

/// The participant field projected by distinct-value queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participant {
    /// The paying user.
    From,
    /// The receiving user.
    To,
}

impl Participant {
    /// Returns the participant of `donation` this field refers to.
    pub fn project<'a>(&self, donation: &'a Donation) -> &'a UserId {
        match self {
            Participant::From => donation.from(),
            Participant::To => donation.to(),
        }
    }
}

/// Builder for donation predicates used by aggregate queries.
///
/// A filter cannot name a status. Aggregates evaluate it only through
/// [`DonationFilter::confirmed`], so they never see unsettled donations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DonationFilter {
    /// Filter by receiving user.
    pub recipient: Option<UserId>,

    /// Filter by paying user.
    pub donor: Option<UserId>,

    /// Filter by attributed post.
    pub post: Option<PostId>,
}

impl DonationFilter {
    /// Creates a filter matching every donation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filter for donations received by `user`.
    pub fn for_recipient(user: UserId) -> Self {
        Self::new().recipient(user)
    }

    /// Creates a filter for donations paid by `user`.
    pub fn for_donor(user: UserId) -> Self {
        Self::new().donor(user)
    }

    /// Creates a filter for donations attributed to `post`.
    pub fn for_post(post: PostId) -> Self {
        Self::new().post(post)
    }

    pub fn recipient(mut self, user: UserId) -> Self {
        self.recipient = Some(user);
        self
    }

    pub fn donor(mut self, user: UserId) -> Self {
        self.donor = Some(user);
        self
    }

    pub fn post(mut self, post: PostId) -> Self {
        self.post = Some(post);
        self
    }

    /// Restricts this filter to confirmed donations.
    pub fn confirmed(self) -> ConfirmedFilter {
        ConfirmedFilter { filter: self }
    }

    fn matches_fields(&self, donation: &Donation) -> bool {
        if let Some(ref user) = self.recipient
            && donation.to() != user
        {
            return false;
        }
        if let Some(ref user) = self.donor
            && donation.from() != user
        {
            return false;
        }
        if let Some(ref post) = self.post
            && donation.post() != Some(post)
        {
            return false;
        }
        true
    }
}

/// A [`DonationFilter`] that additionally requires `status = Confirmed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedFilter {
    filter: DonationFilter,
}

impl ConfirmedFilter {
    /// The only status an aggregate query may observe.
    pub const STATUS: DonationStatus = DonationStatus::Confirmed;

    /// Returns the field predicates.
    pub fn fields(&self) -> &DonationFilter {
        &self.filter
    }

    /// Returns true if `donation` is confirmed and matches every predicate.
    pub fn matches(&self, donation: &Donation) -> bool {
        donation.status() == Self::STATUS && self.filter.matches_fields(donation)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use domain::DonationUpdate;

    use super::*;

    fn donation_with_status(status: DonationStatus) -> Donation {
        let mut d = Donation::new(
            UserId::from("u1"),
            UserId::from("u2"),
            Some(PostId::new("p1")),
            10_000,
        )
        .unwrap();
        let path: &[DonationStatus] = match status {
            DonationStatus::New => &[],
            DonationStatus::Pending => &[DonationStatus::Pending],
            other => &[DonationStatus::Pending, other],
        };
        for next in path {
            d.apply_update(DonationUpdate::Status(*next), Utc::now())
                .unwrap();
        }
        d
    }

    #[test]
    fn confirmed_filter_rejects_unsettled_donations() {
        let filter = DonationFilter::new().confirmed();

        assert!(!filter.matches(&donation_with_status(DonationStatus::New)));
        assert!(!filter.matches(&donation_with_status(DonationStatus::Pending)));
        assert!(!filter.matches(&donation_with_status(DonationStatus::Failed)));
        assert!(filter.matches(&donation_with_status(DonationStatus::Confirmed)));
    }

    #[test]
    fn field_predicates_are_combined() {
        let d = donation_with_status(DonationStatus::Confirmed);

        assert!(
            DonationFilter::for_recipient(UserId::from("u2"))
                .confirmed()
                .matches(&d)
        );
        assert!(
            !DonationFilter::for_recipient(UserId::from("u1"))
                .confirmed()
                .matches(&d)
        );
        assert!(
            DonationFilter::for_donor(UserId::from("u1"))
                .post(PostId::new("p1"))
                .confirmed()
                .matches(&d)
        );
        assert!(
            !DonationFilter::for_donor(UserId::from("u1"))
                .post(PostId::new("p2"))
                .confirmed()
                .matches(&d)
        );
    }

    #[test]
    fn post_filter_skips_donations_without_post() {
        let mut d = Donation::new(UserId::from("u1"), UserId::from("u2"), None, 10_000).unwrap();
        d.apply_update(DonationUpdate::Status(DonationStatus::Pending), Utc::now())
            .unwrap();
        d.apply_update(DonationUpdate::Status(DonationStatus::Confirmed), Utc::now())
            .unwrap();

        assert!(
            !DonationFilter::for_post(PostId::new("p1"))
                .confirmed()
                .matches(&d)
        );
    }

    #[test]
    fn participant_projection() {
        let d = donation_with_status(DonationStatus::New);
        assert_eq!(Participant::From.project(&d).as_str(), "u1");
        assert_eq!(Participant::To.project(&d).as_str(), "u2");
    }
}
