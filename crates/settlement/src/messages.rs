//! Wire messages exchanged with the payment processor.

use common::{DonationId, UserId};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Outbound request asking the processor to collect a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    #[serde(rename = "orderID")]
    pub order_id: DonationId,

    #[serde(rename = "payerID")]
    pub payer_id: UserId,

    #[serde(rename = "amountMinorUnits")]
    pub amount_minor_units: u64,
}

impl PaymentRequest {
    pub fn new(order_id: DonationId, payer_id: UserId, amount_minor_units: u64) -> Self {
        Self {
            order_id,
            payer_id,
            amount_minor_units,
        }
    }
}

/// Payment status reported by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Payment opened, waiting for the payer to complete it.
    Processing,
    /// Payment settled.
    Confirmed,
    /// Payment failed.
    Failed,
    /// Any status this service does not know about.
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Processing => "processing",
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound notification that a payment changed status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusUpdate {
    #[serde(rename = "orderID")]
    pub order_id: DonationId,

    pub status: PaymentStatus,

    /// Where the payer completes the payment; sent with `Processing`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PaymentStatusUpdate {
    pub fn processing(order_id: DonationId, url: impl Into<String>) -> Self {
        Self {
            order_id,
            status: PaymentStatus::Processing,
            url: Some(url.into()),
        }
    }

    pub fn confirmed(order_id: DonationId) -> Self {
        Self {
            order_id,
            status: PaymentStatus::Confirmed,
            url: None,
        }
    }

    pub fn failed(order_id: DonationId) -> Self {
        Self {
            order_id,
            status: PaymentStatus::Failed,
            url: None,
        }
    }
}

/// Serializes a wire message.
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(message)
}

/// Deserializes a wire message.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(payload)
}
