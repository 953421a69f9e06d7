//! CLV composition — combines the two fitted models and a discount schedule
//! into one lifetime-value estimate per customer. Purely deterministic given
//! fitted parameters; no optimizer runs at composition time.

use crate::{
    config::AnalysisConfig,
    monetary::{self, MonetaryParams},
    purchase_dropout::{self, PurchaseDropoutParams},
    rfm::RfmProfile,
    types::CustomerId,
};
use serde::{Deserialize, Serialize};

/// Derived per-customer estimate. Recomputed whenever parameters or horizon
/// change; always replaced, never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClvEstimate {
    pub customer_id: CustomerId,
    pub p_alive: f64,
    /// Expected transactions over the whole horizon.
    pub expected_future_transactions: f64,
    /// `None` when the monetary model is unavailable for this run.
    pub expected_avg_value: Option<f64>,
    /// Discounted expected value over the horizon; `None` without a monetary
    /// model — explicitly unavailable, never silently zero.
    pub predicted_clv: Option<f64>,
    pub horizon_periods: u32,
    pub discount_rate: f64,
}

/// Compose one customer's estimate.
///
/// The discount schedule is declining-balance across sub-periods: the
/// incremental expected transactions of period k are valued at the customer's
/// expected average transaction value and divided by (1 + d)^k, so later
/// expected purchases are worth less. Frequency-0 customers are valued at the
/// population mean spend.
pub fn compose(
    profile: &RfmProfile,
    pd_params: &PurchaseDropoutParams,
    monetary_params: Option<&MonetaryParams>,
    config: &AnalysisConfig,
) -> ClvEstimate {
    let p_alive = purchase_dropout::probability_alive(profile, pd_params);
    let expected_total =
        purchase_dropout::expected_future_transactions(profile, pd_params, config.horizon_days());

    let (expected_avg_value, predicted_clv) = match monetary_params {
        Some(mp) => {
            let avg_value = monetary::expected_average_value(profile, mp);
            let discounted = discounted_value(profile, pd_params, avg_value, config);
            (Some(avg_value), Some(discounted))
        }
        None => (None, None),
    };

    ClvEstimate {
        customer_id: profile.customer_id.clone(),
        p_alive,
        expected_future_transactions: expected_total,
        expected_avg_value,
        predicted_clv,
        horizon_periods: config.horizon_periods,
        discount_rate: config.discount_rate_per_period,
    }
}

fn discounted_value(
    profile: &RfmProfile,
    pd_params: &PurchaseDropoutParams,
    avg_value: f64,
    config: &AnalysisConfig,
) -> f64 {
    let rate = config.discount_rate_per_period;
    let mut total = 0.0;
    let mut cumulative_prev = 0.0;
    for period in 1..=config.horizon_periods {
        let cumulative = purchase_dropout::expected_future_transactions(
            profile,
            pd_params,
            f64::from(period) * config.period_days,
        );
        let incremental = (cumulative - cumulative_prev).max(0.0);
        total += incremental * avg_value / (1.0 + rate).powi(period as i32);
        cumulative_prev = cumulative;
    }
    total
}
