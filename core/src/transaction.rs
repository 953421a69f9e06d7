//! Raw transaction records and population-level input validation.

use crate::{
    error::{ClvError, ClvResult},
    types::CustomerId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One purchase event. Immutable, externally supplied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub customer_id: CustomerId,
    pub timestamp: DateTime<Utc>,
    pub amount: f64,
}

impl Transaction {
    pub fn new(customer_id: impl Into<CustomerId>, timestamp: DateTime<Utc>, amount: f64) -> Self {
        Self {
            customer_id: customer_id.into(),
            timestamp,
            amount,
        }
    }
}

/// Group transactions per customer, preserving input order, and validate the
/// population-level invariants:
///   - every amount is finite and strictly positive;
///   - each customer's stream is time-ordered (no timestamp before that
///     customer's first recorded purchase).
///
/// Violations are contradictory input, not per-customer noise, and abort the
/// run with `DataValidation`.
pub fn group_by_customer(
    transactions: &[Transaction],
) -> ClvResult<BTreeMap<CustomerId, Vec<&Transaction>>> {
    let mut grouped: BTreeMap<CustomerId, Vec<&Transaction>> = BTreeMap::new();

    for txn in transactions {
        if !(txn.amount.is_finite() && txn.amount > 0.0) {
            return Err(ClvError::DataValidation {
                reason: format!(
                    "customer {}: non-positive transaction amount {}",
                    txn.customer_id, txn.amount
                ),
            });
        }
        let entry = grouped.entry(txn.customer_id.clone()).or_default();
        if let Some(prev) = entry.last() {
            if txn.timestamp < prev.timestamp {
                return Err(ClvError::DataValidation {
                    reason: format!(
                        "customer {}: transaction at {} precedes an earlier record at {}",
                        txn.customer_id, txn.timestamp, prev.timestamp
                    ),
                });
            }
        }
        entry.push(txn);
    }

    Ok(grouped)
}

/// Fractional days between two instants. Negative if `b` precedes `a`.
pub(crate) fn days_between(a: DateTime<Utc>, b: DateTime<Utc>) -> f64 {
    (b - a).num_seconds() as f64 / 86_400.0
}
