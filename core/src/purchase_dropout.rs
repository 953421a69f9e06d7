//! Purchase-dropout estimator (Beta-Geometric / NBD).
//!
//! Model: each customer transacts as a Poisson process with rate λ, where
//! λ ~ Gamma(r, rate α) across the population; after every repeat purchase
//! the customer permanently drops out with probability p, where p ~ Beta(a, b)
//! across the population. The per-customer likelihood of observing
//! (frequency, recency, T) has the closed Fader–Hardie form below; the joint
//! MLE over (r, α, a, b) does not, so the fit runs the simplex optimizer over
//! log-parameters.
//!
//! Frequency-0 customers stay in this fit — their (0, 0, T) triple carries
//! real information about the dropout process.

use crate::{
    config::AnalysisConfig,
    error::{ClvError, ClvResult},
    math::{hyp2f1, ln_beta, ln_gamma, log_sum_exp2},
    optimizer::{self, FitOptions},
    rfm::RfmProfile,
};
use serde::{Deserialize, Serialize};

/// Fitted population parameters. All strictly positive; immutable after fit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PurchaseDropoutParams {
    pub r: f64,
    pub alpha: f64,
    pub a: f64,
    pub b: f64,
}

// Log-space starting points: all-ones, and a deliberately different corner
// for the single bounded retry.
const START: [f64; 4] = [0.0, 0.0, 0.0, 0.0];
const RETRY_START: [f64; 4] = [-0.7, 2.3, -1.2, 1.6];

/// Closed-form log-likelihood of one customer's (frequency, recency, T).
pub fn log_likelihood(params: &PurchaseDropoutParams, profile: &RfmProfile) -> f64 {
    let PurchaseDropoutParams { r, alpha, a, b } = *params;
    let x = profile.frequency as f64;
    let t_x = profile.recency_days;
    let t = profile.t_days;

    let a1 = ln_gamma(r + x) - ln_gamma(r) + r * alpha.ln();
    let a2 = ln_beta(a, b + x) - ln_beta(a, b);
    // Still-active branch: exactly x repeats by t_x, none since.
    let a3 = -(r + x) * (alpha + t).ln();
    // Dropped-out-after-the-last-purchase branch; impossible for x = 0.
    let a4 = if profile.frequency > 0 {
        a.ln() - (b + x - 1.0).ln() - (r + x) * (alpha + t_x).ln()
    } else {
        f64::NEG_INFINITY
    };

    a1 + a2 + log_sum_exp2(a3, a4)
}

/// Population log-likelihood: plain sum over all profiles.
pub fn population_log_likelihood(params: &PurchaseDropoutParams, profiles: &[RfmProfile]) -> f64 {
    profiles.iter().map(|p| log_likelihood(params, p)).sum()
}

/// Fit (r, α, a, b) by maximum likelihood over the whole population.
///
/// Retries once from an alternate starting point before surfacing
/// `NonConvergence`; a converged but degenerate parameter set surfaces
/// `InvalidParameter` instead of being returned.
pub fn fit(profiles: &[RfmProfile], config: &AnalysisConfig) -> ClvResult<PurchaseDropoutParams> {
    if profiles.is_empty() {
        return Err(ClvError::InsufficientData {
            model: "purchase-dropout",
            got: 0,
            need: 1,
        });
    }

    let n = profiles.len() as f64;
    let penalizer = config.penalizer_coef;
    let objective = |theta: &[f64]| -> f64 {
        let params = params_from_log(theta);
        let penalty: f64 = penalizer
            * (params.r * params.r
                + params.alpha * params.alpha
                + params.a * params.a
                + params.b * params.b);
        -population_log_likelihood(&params, profiles) / n + penalty
    };

    let options = FitOptions {
        max_iterations: config.optimizer_max_iterations,
        tolerance: config.optimizer_tolerance,
    };

    let mut outcome = optimizer::minimize(&objective, &START, &options);
    if !outcome.converged {
        log::warn!(
            "purchase-dropout: fit did not converge in {} iterations, retrying from alternate start",
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
        "purchase-dropout: fit converged in {} iterations: r={:.4} alpha={:.4} a={:.4} b={:.4}",
        outcome.iterations,
        params.r,
        params.alpha,
        params.a,
        params.b
    );
    Ok(params)
}

/// P(customer is still active | frequency, recency, T).
///
/// Exactly 1.0 for frequency-0 customers: with no repeat purchase there has
/// been no dropout opportunity under this model.
pub fn probability_alive(profile: &RfmProfile, params: &PurchaseDropoutParams) -> f64 {
    if profile.frequency == 0 {
        return 1.0;
    }
    let PurchaseDropoutParams { r, alpha, a, b } = *params;
    let x = profile.frequency as f64;
    let odds_dropped = a / (b + x - 1.0)
        * ((alpha + profile.t_days) / (alpha + profile.recency_days)).powf(r + x);
    1.0 / (1.0 + odds_dropped)
}

/// Expected number of transactions in the next `horizon_days`, conditional on
/// the customer's observed history. Deterministic closed form via ₂F₁; no
/// optimization at query time.
pub fn expected_future_transactions(
    profile: &RfmProfile,
    params: &PurchaseDropoutParams,
    horizon_days: f64,
) -> f64 {
    if horizon_days <= 0.0 {
        return 0.0;
    }
    let PurchaseDropoutParams { r, alpha, a, b } = *params;
    let x = profile.frequency as f64;
    let t_x = profile.recency_days;
    let t_cal = profile.t_days;

    let z = horizon_days / (alpha + t_cal + horizon_days);
    let hyp = hyp2f1(r + x, b + x, a + b + x - 1.0, z);

    let unconditional = (a + b + x - 1.0) / (a - 1.0)
        * (1.0 - ((alpha + t_cal) / (alpha + t_cal + horizon_days)).powf(r + x) * hyp);
    let alive_odds = if profile.frequency > 0 {
        a / (b + x - 1.0) * ((alpha + t_cal) / (alpha + t_x)).powf(r + x)
    } else {
        0.0
    };

    (unconditional / (1.0 + alive_odds)).max(0.0)
}

fn params_from_log(theta: &[f64]) -> PurchaseDropoutParams {
    PurchaseDropoutParams {
        r: theta[0].exp(),
        alpha: theta[1].exp(),
        a: theta[2].exp(),
        b: theta[3].exp(),
    }
}

fn validate_params(params: &PurchaseDropoutParams) -> ClvResult<()> {
    let fields = [
        ("r", params.r),
        ("alpha", params.alpha),
        ("a", params.a),
        ("b", params.b),
    ];
    for (name, value) in fields {
        if !(value.is_finite() && value > 0.0) {
            return Err(ClvError::InvalidParameter {
                reason: format!("purchase-dropout parameter {name} = {value}"),
            });
        }
    }
    Ok(())
}
