//! Analysis configuration.
//!
//! RULE: configuration is an explicit, immutable value passed into each
//! component's entry point. Nothing in the engine reads ambient state.

use crate::error::{ClvError, ClvResult};
use serde::{Deserialize, Serialize};

/// Period bucketing for cohort construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CohortBucket {
    /// Calendar month (default).
    Month,
    /// ISO week, Monday-anchored.
    Week,
    /// Calendar quarter.
    Quarter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of discount sub-periods the CLV horizon is split into.
    pub horizon_periods: u32,
    /// Length of one sub-period in days.
    pub period_days: f64,
    /// Declining-balance discount rate per sub-period, in [0, 1).
    pub discount_rate_per_period: f64,
    /// First-purchase bucketing for the retention matrix.
    pub cohort_bucket: CohortBucket,
    /// Quantile cut points splitting the composite score into five tiers.
    /// Strictly increasing, each in (0, 1).
    pub segment_cutpoints: [f64; 4],
    /// Hard ceiling on optimizer iterations. Always enforced.
    pub optimizer_max_iterations: usize,
    /// Convergence tolerance on the simplex objective spread.
    pub optimizer_tolerance: f64,
    /// L2 penalty on fitted parameters. 0.0 disables penalization.
    pub penalizer_coef: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            horizon_periods: 12,
            period_days: 30.0,
            discount_rate_per_period: 0.01,
            cohort_bucket: CohortBucket::Month,
            segment_cutpoints: [0.2, 0.4, 0.6, 0.8],
            optimizer_max_iterations: 2000,
            optimizer_tolerance: 1e-8,
            penalizer_coef: 0.0,
        }
    }
}

impl AnalysisConfig {
    /// Load a configuration from a JSON file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: AnalysisConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot honor.
    pub fn validate(&self) -> ClvResult<()> {
        if self.horizon_periods == 0 {
            return Err(invalid("horizon_periods must be at least 1"));
        }
        if !(self.period_days.is_finite() && self.period_days > 0.0) {
            return Err(invalid("period_days must be a positive finite number"));
        }
        if !(0.0..1.0).contains(&self.discount_rate_per_period) {
            return Err(invalid("discount_rate_per_period must be in [0, 1)"));
        }
        let cuts = &self.segment_cutpoints;
        for (i, &c) in cuts.iter().enumerate() {
            if !(0.0 < c && c < 1.0) {
                return Err(invalid("segment cut points must lie in (0, 1)"));
            }
            if i > 0 && c <= cuts[i - 1] {
                return Err(invalid("segment cut points must be strictly increasing"));
            }
        }
        if self.optimizer_max_iterations == 0 {
            return Err(invalid("optimizer_max_iterations must be positive"));
        }
        if !(self.optimizer_tolerance.is_finite() && self.optimizer_tolerance > 0.0) {
            return Err(invalid("optimizer_tolerance must be a positive finite number"));
        }
        if !(self.penalizer_coef.is_finite() && self.penalizer_coef >= 0.0) {
            return Err(invalid("penalizer_coef must be non-negative"));
        }
        Ok(())
    }

    /// Total horizon length in days.
    pub fn horizon_days(&self) -> f64 {
        f64::from(self.horizon_periods) * self.period_days
    }
}

fn invalid(reason: &str) -> ClvError {
    ClvError::Config {
        reason: reason.to_string(),
    }
}
