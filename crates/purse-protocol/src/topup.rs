//! Top-up request grammar and replies.
//!
//! A request is `<username>:<amount>`; surrounding whitespace (including the
//! line terminator) is ignored.

use thiserror::Error;

/// Field separator between username and amount.
pub const SEPARATOR: char = ':';

/// Reply sent when the request does not have exactly two fields.
pub const INVALID_FORMAT_REPLY: &str = "Invalid data format. Format: <username>:<amount>\n";

/// Reply sent when the amount is not a number.
pub const INVALID_AMOUNT_REPLY: &str = "Invalid amount format. Amount should be a valid number.\n";

/// Request parse errors. Each maps to a user-visible reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TopUpError {
    /// Wrong number of fields.
    #[error("invalid data format")]
    InvalidFormat,

    /// Amount is not a finite decimal number.
    #[error("invalid amount format")]
    InvalidAmount,
}

impl TopUpError {
    /// The text reply for this error.
    #[must_use]
    pub fn reply(&self) -> &'static str {
        match self {
            TopUpError::InvalidFormat => INVALID_FORMAT_REPLY,
            TopUpError::InvalidAmount => INVALID_AMOUNT_REPLY,
        }
    }

    /// Short label for metrics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            TopUpError::InvalidFormat => "invalid_format",
            TopUpError::InvalidAmount => "invalid_amount",
        }
    }
}

/// A parsed top-up request.
#[derive(Debug, Clone, PartialEq)]
pub struct TopUpRequest {
    /// Account to credit.
    pub username: String,
    /// Amount to add. Negative amounts are accepted.
    pub amount: f64,
}

impl TopUpRequest {
    /// Create a request.
    #[must_use]
    pub fn new(username: impl Into<String>, amount: f64) -> Self {
        Self {
            username: username.into(),
            amount,
        }
    }

    /// Parse `<username>:<amount>`.
    ///
    /// # Errors
    ///
    /// Returns [`TopUpError::InvalidFormat`] unless the input splits into
    /// exactly two fields, and [`TopUpError::InvalidAmount`] if the amount
    /// is not a finite number.
    pub fn parse(input: &str) -> Result<Self, TopUpError> {
        let mut fields = input.trim().split(SEPARATOR);
        let (Some(username), Some(amount), None) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(TopUpError::InvalidFormat);
        };

        let amount: f64 = amount.parse().map_err(|_| TopUpError::InvalidAmount)?;
        if !amount.is_finite() {
            return Err(TopUpError::InvalidAmount);
        }

        Ok(Self::new(username, amount))
    }

    /// Render as request text (without a line terminator).
    #[must_use]
    pub fn to_line(&self) -> String {
        format!("{}{}{}", self.username, SEPARATOR, self.amount)
    }
}

/// Reply sent after a successful top-up.
#[must_use]
pub fn success_reply(username: &str, balance: f64) -> String {
    format!("Top-up berhasil. Jumlah Saldo {}: {:.2}\n", username, balance)
}
