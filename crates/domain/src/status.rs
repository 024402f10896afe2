//! Donation status state machine.

use serde::{Deserialize, Serialize};

/// The state of a donation in its settlement lifecycle.
///
/// State transitions:
/// ```text
/// New ──► Pending ──┬──► Confirmed
///                   └──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    /// Newly created, payment request not yet acknowledged by the processor.
    #[default]
    New,

    /// The processor opened a payment and waits for the payer's action.
    Pending,

    /// Payment settled (terminal state).
    Confirmed,

    /// Payment failed (terminal state). Never shown to users.
    Failed,
}

impl DonationStatus {
    /// Returns true if `next` is a legal edge from this state.
    pub fn can_transition_to(&self, next: DonationStatus) -> bool {
        matches!(
            (self, next),
            (DonationStatus::New, DonationStatus::Pending)
                | (DonationStatus::Pending, DonationStatus::Confirmed)
                | (DonationStatus::Pending, DonationStatus::Failed)
        )
    }

    /// Returns every state from which `next` can be reached in one step.
    pub fn predecessors(next: DonationStatus) -> &'static [DonationStatus] {
        match next {
            DonationStatus::New => &[],
            DonationStatus::Pending => &[DonationStatus::New],
            DonationStatus::Confirmed | DonationStatus::Failed => &[DonationStatus::Pending],
        }
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DonationStatus::Confirmed | DonationStatus::Failed)
    }

    /// Returns the status name as stored and sent over the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationStatus::New => "new",
            DonationStatus::Pending => "pending",
            DonationStatus::Confirmed => "confirmed",
            DonationStatus::Failed => "failed",
        }
    }

    /// Parses a stored status name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "new" => Some(DonationStatus::New),
            "pending" => Some(DonationStatus::Pending),
            "confirmed" => Some(DonationStatus::Confirmed),
            "failed" => Some(DonationStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
