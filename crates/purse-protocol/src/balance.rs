//! Balance query datagrams.

use std::fmt;

/// Extract the username from a query packet.
///
/// Trailing whitespace is dropped and invalid UTF-8 is replaced.
#[must_use]
pub fn parse_query(packet: &[u8]) -> String {
    String::from_utf8_lossy(packet).trim_end().to_string()
}

/// Reply to a balance query.
#[derive(Debug, Clone, PartialEq)]
pub enum BalanceReply {
    /// The account exists.
    Found {
        /// Queried account.
        username: String,
        /// Current balance.
        balance: f64,
    },
    /// No top-up has ever been made for this account.
    NotFound {
        /// Queried account.
        username: String,
    },
}

impl BalanceReply {
    /// Build a reply from a store lookup.
    #[must_use]
    pub fn from_lookup(username: impl Into<String>, balance: Option<f64>) -> Self {
        let username = username.into();
        match balance {
            Some(balance) => BalanceReply::Found { username, balance },
            None => BalanceReply::NotFound { username },
        }
    }

    /// Whether the account was found.
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, BalanceReply::Found { .. })
    }
}

impl fmt::Display for BalanceReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BalanceReply::Found { username, balance } => {
                write!(f, "Saldo milik {}: {:.2}", username, balance)
            }
            BalanceReply::NotFound { username } => write!(f, "Username {} not found.", username),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        assert_eq!(parse_query(b"alice"), "alice");
        assert_eq!(parse_query(b"alice\r\n"), "alice");
        assert_eq!(parse_query(&[b'a', 0xff]), "a\u{fffd}");
    }

    #[test]
    fn test_reply_text() {
        assert_eq!(
            BalanceReply::from_lookup("alice", Some(150.5)).to_string(),
            "Saldo milik alice: 150.50"
        );
        let missing = BalanceReply::from_lookup("bob", None);
        assert!(!missing.is_found());
        assert_eq!(missing.to_string(), "Username bob not found.");
    }
}
