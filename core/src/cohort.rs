//! Cohort retention analysis — groups customers by first-purchase period and
//! measures what fraction of each cohort transacts in every later period.
//!
//! The denominator is always the cohort's initial size, never the surviving
//! count, so retention figures cannot be inflated by survivorship. Offset 0
//! is exactly 1.0 by construction: every member transacted in the cohort
//! period. Re-activation is allowed — rows need not be monotone.

use crate::{
    config::CohortBucket,
    error::ClvResult,
    transaction::{group_by_customer, Transaction},
};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CohortRow {
    /// Human-readable bucket label, e.g. "2024-03", "2024-W11", "2024-Q1".
    pub cohort_id: String,
    /// Initial cohort size — the fixed denominator.
    pub size: usize,
    /// retention[offset] = fraction of the initial cohort transacting at
    /// least once in the period `offset` buckets after acquisition.
    pub retention: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetentionMatrix {
    pub bucket: CohortBucket,
    pub cohorts: Vec<CohortRow>,
}

/// Build the retention matrix for one bucketing scheme. Rows are ordered by
/// cohort period; each row extends to the last period observed anywhere in
/// the data, so later cohorts simply have shorter rows.
pub fn build_retention_matrix(
    transactions: &[Transaction],
    bucket: CohortBucket,
) -> ClvResult<RetentionMatrix> {
    let grouped = group_by_customer(transactions)?;

    // cohort index -> (label, per-customer sets of active period indices)
    let mut cohorts: BTreeMap<i64, (String, Vec<BTreeSet<i64>>)> = BTreeMap::new();
    let mut last_period = i64::MIN;

    for txns in grouped.values() {
        let first = txns[0].timestamp;
        let cohort_index = bucket_index(first, bucket);
        let active: BTreeSet<i64> = txns
            .iter()
            .map(|t| bucket_index(t.timestamp, bucket))
            .collect();
        last_period = last_period.max(*active.iter().last().unwrap_or(&cohort_index));

        cohorts
            .entry(cohort_index)
            .or_insert_with(|| (bucket_label(first, bucket), Vec::new()))
            .1
            .push(active);
    }

    let rows = cohorts
        .into_iter()
        .map(|(cohort_index, (cohort_id, members))| {
            let size = members.len();
            let width = (last_period - cohort_index + 1).max(1) as usize;
            let mut retention = vec![0.0; width];
            for (offset, slot) in retention.iter_mut().enumerate() {
                let period = cohort_index + offset as i64;
                let active = members.iter().filter(|set| set.contains(&period)).count();
                *slot = active as f64 / size as f64;
            }
            CohortRow {
                cohort_id,
                size,
                retention,
            }
        })
        .collect();

    Ok(RetentionMatrix {
        bucket,
        cohorts: rows,
    })
}

/// Linear period index of a timestamp under a bucketing scheme. Offsets
/// between periods are plain differences of these indices.
fn bucket_index(ts: DateTime<Utc>, bucket: CohortBucket) -> i64 {
    let date = ts.date_naive();
    match bucket {
        CohortBucket::Month => i64::from(date.year()) * 12 + i64::from(date.month0()),
        // 0001-01-01 CE was a Monday, so this floors to Monday-anchored weeks.
        CohortBucket::Week => (i64::from(date.num_days_from_ce()) - 1).div_euclid(7),
        CohortBucket::Quarter => i64::from(date.year()) * 4 + i64::from(date.month0() / 3),
    }
}

fn bucket_label(ts: DateTime<Utc>, bucket: CohortBucket) -> String {
    let date = ts.date_naive();
    match bucket {
        CohortBucket::Month => format!("{:04}-{:02}", date.year(), date.month()),
        CohortBucket::Week => format!("{}", date.format("%G-W%V")),
        CohortBucket::Quarter => format!("{:04}-Q{}", date.year(), date.month0() / 3 + 1),
    }
}
