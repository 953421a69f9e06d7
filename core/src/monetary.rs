//! Monetary-value estimator (Gamma-Gamma).
//!
//! Model: a customer's individual transaction values are Gamma(p, rate ν)
//! with the shape p shared across the population, while the per-customer rate
//! ν is itself Gamma(q, rate v) distributed. The marginal likelihood of a
//! customer's (frequency, mean repeat spend) pair is closed-form; the joint
//! MLE over (p, q, v) is not, so the fit runs the simplex optimizer.
//!
//! Only customers with at least one repeat purchase qualify — a
//! single-purchase customer has no observed repeat spend at all.

use crate::{
    config::AnalysisConfig,
    error::{ClvError, ClvResult},
    math::ln_gamma,
    optimizer::{self, FitOptions},
    rfm::RfmProfile,
};
use serde::{Deserialize, Serialize};

/// Fitted population parameters. All strictly positive; immutable after fit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MonetaryParams {
    pub p: f64,
    pub q: f64,
    pub v: f64,
}

/// Minimum number of repeat customers for an identifiable fit.
pub const MIN_QUALIFYING_CUSTOMERS: usize = 2;

const START: [f64; 3] = [0.0, 0.0, 0.0];
const RETRY_START: [f64; 3] = [1.6, 1.6, -0.7];

/// Closed-form log-likelihood of one qualifying customer's
/// (frequency x ≥ 1, observed mean repeat spend m).
pub fn log_likelihood(params: &MonetaryParams, frequency: u64, mean_spend: f64) -> f64 {
    let MonetaryParams { p, q, v } = *params;
    let x = frequency as f64;
    let m = mean_spend;

    ln_gamma(p * x + q) - ln_gamma(p * x) - ln_gamma(q) + q * v.ln()
        + (p * x - 1.0) * m.ln()
        + p * x * x.ln()
        - (p * x + q) * (v + m * x).ln()
}

/// Fit (p, q, v) over customers with frequency ≥ 1.
///
/// Fails with `InsufficientData` when fewer than
/// [`MIN_QUALIFYING_CUSTOMERS`] qualify; `NonConvergence` /
/// `InvalidParameter` as for the purchase-dropout fit.
pub fn fit(profiles: &[RfmProfile], config: &AnalysisConfig) -> ClvResult<MonetaryParams> {
    let qualifying: Vec<(u64, f64)> = profiles
        .iter()
        .filter_map(|p| p.monetary.map(|m| (p.frequency, m)))
        .collect();

    if qualifying.len() < MIN_QUALIFYING_CUSTOMERS {
        return Err(ClvError::InsufficientData {
            model: "monetary",
            got: qualifying.len(),
            need: MIN_QUALIFYING_CUSTOMERS,
        });
    }

    let n = qualifying.len() as f64;
    let penalizer = config.penalizer_coef;
    let objective = |theta: &[f64]| -> f64 {
        let params = params_from_log(theta);
        let ll: f64 = qualifying
            .iter()
            .map(|&(x, m)| log_likelihood(&params, x, m))
            .sum();
        let penalty = penalizer
            * (params.p * params.p + params.q * params.q + params.v * params.v);
        -ll / n + penalty
    };

    let options = FitOptions {
        max_iterations: config.optimizer_max_iterations,
        tolerance: config.optimizer_tolerance,
    };

    let mut outcome = optimizer::minimize(&objective, &START, &options);
    if !outcome.converged {
        log::warn!(
            "monetary: fit did not converge in {} iterations, retrying from alternate start",
            outcome.iterations
        );
        outcome = optimizer::minimize(&objective, &RETRY_START, &options);
    }
    if !outcome.converged {
        return Err(ClvError::NonConvergence {
            iterations: outcome.iterations,
            tolerance: options.tolerance,
        });
    }

    let params = params_from_log(&outcome.position);
    validate_params(&params)?;

    log::info!(
        "monetary: fit converged in {} iterations over {} customers: p={:.4} q={:.4} v={:.4}",
        outcome.iterations,
        qualifying.len(),
        params.p,
        params.q,
        params.v
    );
    Ok(params)
}

/// Conditional expected mean transaction value for one customer.
///
/// This is the exact posterior mean — a shrinkage blend of the customer's
/// observed mean spend and the population mean, weighted by frequency:
///
///   E[M | m, x] = (q − 1)/(p·x + q − 1) · p·v/(q − 1)
///              + (p·x)/(p·x + q − 1) · m
///
/// computed in its collapsed form `p(v + m·x)/(p·x + q − 1)`. Customers with
/// no monetary observation get the population mean.
pub fn expected_average_value(profile: &RfmProfile, params: &MonetaryParams) -> f64 {
    match profile.monetary {
        Some(m) => {
            let x = profile.frequency as f64;
            params.p * (params.v + m * x) / (params.p * x + params.q - 1.0)
        }
        None => population_mean_value(params),
    }
}

/// Population mean transaction value, E[M] = p·v/(q − 1).
pub fn population_mean_value(params: &MonetaryParams) -> f64 {
    params.p * params.v / (params.q - 1.0)
}

fn params_from_log(theta: &[f64]) -> MonetaryParams {
    MonetaryParams {
        p: theta[0].exp(),
        q: theta[1].exp(),
        v: theta[2].exp(),
    }
}

fn validate_params(params: &MonetaryParams) -> ClvResult<()> {
    let fields = [("p", params.p), ("q", params.q), ("v", params.v)];
    for (name, value) in fields {
        if !(value.is_finite() && value > 0.0) {
            return Err(ClvError::InvalidParameter {
                reason: format!("monetary parameter {name} = {value}"),
            });
        }
    }
    Ok(())
}
