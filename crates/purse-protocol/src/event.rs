//! Donation events carried on the pub/sub feed.

use serde::{Deserialize, Serialize, Serializer};

use crate::codec::ProtocolError;

/// A donation broadcast to every feed subscriber.
///
/// Top-up notifications reuse this shape so that subscribers only ever have
/// to understand one kind of frame.
///
/// Missing fields decode to their zero values. Whole amounts are encoded as
/// JSON integers (`5`, not `5.0`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DonationEvent {
    /// Donor (or topped-up account) name.
    pub name: String,
    /// Amount donated or credited.
    #[serde(serialize_with = "serialize_amount")]
    pub amount: f64,
    /// Free-form message.
    pub message: String,
}

impl DonationEvent {
    /// Create a new donation event.
    #[must_use]
    pub fn new(name: impl Into<String>, amount: f64, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            amount,
            message: message.into(),
        }
    }

    /// Build the notification sent to subscribers after a successful top-up.
    #[must_use]
    pub fn top_up(name: impl Into<String>, amount: f64, new_balance: f64) -> Self {
        Self::new(
            name,
            amount,
            format!("Top-up berhasil. Jumlah Saldo : {:.2}", new_balance),
        )
    }

    /// Encode as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a JSON donation object.
    pub fn from_json(data: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Human readable one-line summary, used in server logs and the client.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Donasi dari {}: Rp{:.2}. Pesan: {}",
            self.name, self.amount, self.message
        )
    }
}

/// Largest magnitude at which every whole `f64` is exactly an integer.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn serialize_amount<S: Serializer>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if amount.fract() == 0.0 && amount.abs() <= MAX_EXACT_INTEGER {
        serializer.serialize_i64(*amount as i64)
    } else {
        serializer.serialize_f64(*amount)
    }
}
