//! Analysis run orchestration.
//!
//! STAGE ORDER (fixed, documented, never reordered):
//!   1. RFM summarization
//!   2. Purchase-dropout fit ┐ run concurrently — the two fits share no
//!      Monetary fit         ┘ parameters and read the same profiles
//!   3. CLV composition
//!   4. Segmentation
//!   5. Cohort retention matrix
//!
//! Fitted parameter objects are written once, at fit completion, and
//! read-only afterwards; nothing downstream mutates shared state.

use crate::{
    clv::{self, ClvEstimate},
    cohort::{self, RetentionMatrix},
    config::AnalysisConfig,
    error::{ClvError, ClvResult},
    monetary::{self, MonetaryParams},
    purchase_dropout::{self, PurchaseDropoutParams},
    rfm,
    segmentation::{self, Segment},
    transaction::Transaction,
    types::CustomerId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Flat per-customer output record — the schema handed to external
/// serializers and reporting collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerRecord {
    pub customer_id: CustomerId,
    pub recency_days: f64,
    pub frequency: u64,
    pub t_days: f64,
    pub monetary: Option<f64>,
    pub p_alive: f64,
    pub expected_future_transactions: f64,
    pub expected_avg_value: Option<f64>,
    pub predicted_clv: Option<f64>,
    pub segment: Segment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub analysis_now: DateTime<Utc>,
    pub purchase_dropout: PurchaseDropoutParams,
    /// `None` when too few repeat customers existed to fit the monetary
    /// model; every value field downstream is `None` in that case.
    pub monetary: Option<MonetaryParams>,
    pub customers: Vec<CustomerRecord>,
    pub retention: RetentionMatrix,
}

impl AnalysisReport {
    pub fn monetary_model_available(&self) -> bool {
        self.monetary.is_some()
    }
}

/// Execute one full analysis run over a transaction log, anchored at `now`.
///
/// A monetary fit that fails for lack of qualifying customers degrades the
/// run (value estimates become unavailable but are clearly marked so);
/// every other fit failure aborts — a non-converged or degenerate parameter
/// set is never substituted silently.
pub fn run_analysis(
    transactions: &[Transaction],
    config: &AnalysisConfig,
    now: DateTime<Utc>,
) -> ClvResult<AnalysisReport> {
    config.validate()?;

    let profiles = rfm::summarize(transactions, now)?;
    if profiles.is_empty() {
        return Err(ClvError::DataValidation {
            reason: "no analyzable customers in the transaction log".to_string(),
        });
    }

    // The two fits are independent single-threaded optimizations; run them
    // side by side.
    let (pd_result, mon_result) = std::thread::scope(|scope| {
        let pd = scope.spawn(|| purchase_dropout::fit(&profiles, config));
        let mon = scope.spawn(|| monetary::fit(&profiles, config));
        (
            pd.join().expect("purchase-dropout fit thread panicked"),
            mon.join().expect("monetary fit thread panicked"),
        )
    });

    let pd_params = pd_result?;
    let mon_params = match mon_result {
        Ok(params) => Some(params),
        Err(ClvError::InsufficientData { model, got, need }) => {
            log::warn!(
                "pipeline: {model} model unavailable ({got} qualifying customers, need {need}); \
                 value estimates will be marked unavailable"
            );
            None
        }
        Err(other) => return Err(other),
    };

    let estimates: Vec<ClvEstimate> = profiles
        .iter()
        .map(|p| clv::compose(p, &pd_params, mon_params.as_ref(), config))
        .collect();

    let segments = segmentation::segment(&profiles, &estimates, &config.segment_cutpoints)?;
    let retention = cohort::build_retention_matrix(transactions, config.cohort_bucket)?;

    let customers = profiles
        .iter()
        .zip(&estimates)
        .map(|(profile, estimate)| CustomerRecord {
            customer_id: profile.customer_id.clone(),
            recency_days: profile.recency_days,
            frequency: profile.frequency,
            t_days: profile.t_days,
            monetary: profile.monetary,
            p_alive: estimate.p_alive,
            expected_future_transactions: estimate.expected_future_transactions,
            expected_avg_value: estimate.expected_avg_value,
            predicted_clv: estimate.predicted_clv,
            // segment() assigns every profiled customer exactly once.
            segment: segments[&profile.customer_id],
        })
        .collect();

    log::info!(
        "pipeline: analyzed {} customers, {} cohorts",
        profiles.len(),
        retention.cohorts.len()
    );

    Ok(AnalysisReport {
        analysis_now: now,
        purchase_dropout: pd_params,
        monetary: mon_params,
        customers,
        retention,
    })
}
