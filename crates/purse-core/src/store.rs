//! In-memory balance table.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Account balances keyed by username.
///
/// Every operation runs under one exclusive lock, so credits and reads are
/// totally ordered. The lock is never held across an `.await`.
#[derive(Debug, Default)]
pub struct BalanceStore {
    accounts: Mutex<HashMap<String, f64>>,
}

impl BalanceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, f64>> {
        // A panicking holder cannot leave a plain f64 half-written.
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `amount` to `account`, creating it at zero first if needed.
    ///
    /// Returns the new balance.
    pub fn credit(&self, account: &str, amount: f64) -> f64 {
        let mut accounts = self.lock();
        let balance = accounts.entry(account.to_string()).or_insert(0.0);
        *balance += amount;
        trace!(account = %account, amount, balance = *balance, "Credited");
        *balance
    }

    /// Current balance of `account`, or `None` if it was never credited.
    #[must_use]
    pub fn get(&self, account: &str) -> Option<f64> {
        self.lock().get(account).copied()
    }

    /// Number of known accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no account has been credited yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
