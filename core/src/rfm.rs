//! RFM summarization — reduces each customer's purchase history to the
//! (recency, frequency, T, monetary) scalars both model fits consume.
//!
//! Definitions (all times in fractional days):
//!   - frequency = repeat purchases = total transactions − 1
//!   - recency   = last purchase − first purchase
//!   - T         = analysis date − first purchase
//!   - monetary  = mean spend over transactions after the first;
//!                 `None` when the customer never repeated.

use crate::{
    error::ClvResult,
    transaction::{days_between, group_by_customer, Transaction},
    types::CustomerId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RfmProfile {
    pub customer_id: CustomerId,
    /// Repeat-purchase count. The first purchase does not count.
    pub frequency: u64,
    /// Days from first to last purchase. 0 for single-purchase customers.
    pub recency_days: f64,
    /// Days from first purchase to the analysis date.
    pub t_days: f64,
    /// Mean spend per repeat purchase. `None` when frequency = 0 — downstream
    /// code must treat this as "no monetary data", never as zero.
    pub monetary: Option<f64>,
}

/// Summarize a transaction log into one profile per customer, anchored at
/// `now`. Customers whose records are internally inconsistent (analysis date
/// before their first purchase, non-finite derived values) are skipped with a
/// warning; the run continues for the rest of the population.
pub fn summarize(transactions: &[Transaction], now: DateTime<Utc>) -> ClvResult<Vec<RfmProfile>> {
    let grouped = group_by_customer(transactions)?;
    let mut profiles = Vec::with_capacity(grouped.len());

    for (customer_id, txns) in grouped {
        // group_by_customer never yields an empty group.
        let first = txns[0].timestamp;
        let last = txns[txns.len() - 1].timestamp;

        let recency_days = days_between(first, last);
        let t_days = days_between(first, now);

        if !(recency_days >= 0.0 && recency_days <= t_days && t_days.is_finite()) {
            log::warn!(
                "rfm: skipping customer {customer_id}: inconsistent recency/T \
                 (recency={recency_days:.3}d, T={t_days:.3}d)"
            );
            continue;
        }

        let frequency = (txns.len() - 1) as u64;
        let monetary = if frequency > 0 {
            let repeat_total: f64 = txns[1..].iter().map(|t| t.amount).sum();
            Some(repeat_total / frequency as f64)
        } else {
            None
        };

        profiles.push(RfmProfile {
            customer_id,
            frequency,
            recency_days,
            t_days,
            monetary,
        });
    }

    log::info!(
        "rfm: summarized {} customers from {} transactions",
        profiles.len(),
        transactions.len()
    );
    Ok(profiles)
}
