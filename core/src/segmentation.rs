//! Behavioral segmentation — partitions the current population into five
//! fixed tiers by quantile rank of a composite (recency, frequency, value)
//! score.
//!
//! Boundaries are relative to the population analyzed in this run, never
//! absolute thresholds, so they are recomputed every run. All rankings break
//! ties by customer_id ascending, which makes the whole assignment
//! deterministic for a fixed input set.

use crate::{
    clv::ClvEstimate,
    error::{ClvError, ClvResult},
    rfm::RfmProfile,
    types::CustomerId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Behavioral tier, lowest to highest engagement/value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Dormant,
    AtRisk,
    Promising,
    Loyal,
    Champion,
}

impl Segment {
    fn from_tier(tier: usize) -> Self {
        match tier {
            0 => Segment::Dormant,
            1 => Segment::AtRisk,
            2 => Segment::Promising,
            3 => Segment::Loyal,
            _ => Segment::Champion,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Segment::Dormant => "dormant",
            Segment::AtRisk => "at_risk",
            Segment::Promising => "promising",
            Segment::Loyal => "loyal",
            Segment::Champion => "champion",
        }
    }
}

/// Assign exactly one segment to every customer.
///
/// `profiles` and `estimates` must describe the same customers in the same
/// order (as produced by the pipeline). The composite score averages the
/// empirical percentile ranks of recency, frequency, and predicted CLV;
/// when the monetary model is unavailable the value rank falls back to
/// expected future transactions.
pub fn segment(
    profiles: &[RfmProfile],
    estimates: &[ClvEstimate],
    cutpoints: &[f64; 4],
) -> ClvResult<BTreeMap<CustomerId, Segment>> {
    if profiles.len() != estimates.len() {
        return Err(ClvError::DataValidation {
            reason: format!(
                "segmentation input mismatch: {} profiles vs {} estimates",
                profiles.len(),
                estimates.len()
            ),
        });
    }
    for (p, e) in profiles.iter().zip(estimates) {
        if p.customer_id != e.customer_id {
            return Err(ClvError::DataValidation {
                reason: format!(
                    "segmentation input mismatch: profile {} vs estimate {}",
                    p.customer_id, e.customer_id
                ),
            });
        }
    }
    if profiles.is_empty() {
        return Ok(BTreeMap::new());
    }

    // Higher rank is better for all three components. The recency component
    // scores how recently the customer was last seen: the shorter the silent
    // stretch since the last purchase, the higher the rank.
    let recency_rank = percentile_ranks(profiles, |p, _| -days_since_last_purchase(p));
    let frequency_rank = percentile_ranks(profiles, |p, _| p.frequency as f64);
    let value_rank = percentile_ranks(profiles, |_, i| {
        let e = &estimates[i];
        e.predicted_clv.unwrap_or(e.expected_future_transactions)
    });

    let composite: Vec<f64> = (0..profiles.len())
        .map(|i| (recency_rank[i] + frequency_rank[i] + value_rank[i]) / 3.0)
        .collect();
    let composite_rank = percentile_ranks(profiles, |_, i| composite[i]);

    let mut segments = BTreeMap::new();
    for (i, profile) in profiles.iter().enumerate() {
        let pct = composite_rank[i];
        let tier = cutpoints.iter().filter(|&&c| c < pct).count();
        segments.insert(profile.customer_id.clone(), Segment::from_tier(tier));
    }
    Ok(segments)
}

/// Days the customer has been silent: observation length minus the
/// first-to-last-purchase span.
fn days_since_last_purchase(profile: &RfmProfile) -> f64 {
    profile.t_days - profile.recency_days
}

/// Empirical percentile rank of each customer under `key`, in input order.
/// Rank i (0-based, ascending by key then customer_id) maps to (i+1)/n, so
/// percentiles lie in (0, 1].
fn percentile_ranks<F>(profiles: &[RfmProfile], key: F) -> Vec<f64>
where
    F: Fn(&RfmProfile, usize) -> f64,
{
    let n = profiles.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| {
        key(&profiles[i], i)
            .total_cmp(&key(&profiles[j], j))
            .then_with(|| profiles[i].customer_id.cmp(&profiles[j].customer_id))
    });

    let mut ranks = vec![0.0; n];
    for (rank, &idx) in order.iter().enumerate() {
        ranks[idx] = (rank + 1) as f64 / n as f64;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str, recency_days: f64, t_days: f64) -> RfmProfile {
        RfmProfile {
            customer_id: id.to_string(),
            frequency: 4,
            recency_days,
            t_days,
            monetary: Some(30.0),
        }
    }

    /// The recency component measures silence since the last purchase, not
    /// tenure: a long-tenured customer quiet for 100 days must rank below a
    /// fresh customer who bought 5 days ago, even though the tenured
    /// customer's first-to-last span is far larger.
    #[test]
    fn recency_component_ranks_shortest_silence_highest() {
        let tenured_but_quiet = profile("tenured", 300.0, 400.0);
        let fresh = profile("fresh", 25.0, 30.0);
        let profiles = vec![fresh, tenured_but_quiet];

        let ranks = percentile_ranks(&profiles, |p, _| -days_since_last_purchase(p));

        assert!(
            ranks[0] > ranks[1],
            "5 days silent (rank {}) must outrank 100 days silent (rank {})",
            ranks[0],
            ranks[1]
        );
    }

    /// A customer last seen today has zero silence regardless of tenure.
    #[test]
    fn silence_is_observation_length_minus_span() {
        let p = profile("c", 120.0, 200.0);
        assert!((days_since_last_purchase(&p) - 80.0).abs() < 1e-12);
        let current = profile("c", 200.0, 200.0);
        assert_eq!(days_since_last_purchase(&current), 0.0);
    }
}
