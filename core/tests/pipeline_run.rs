use chrono::{Duration, TimeZone, Utc};
use clv_core::{
    monetary::MonetaryParams, purchase_dropout::PurchaseDropoutParams, run_analysis,
    synthetic::SyntheticConfig, AnalysisConfig, Transaction,
};
use std::collections::BTreeSet;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn synth_config(n_customers: usize) -> SyntheticConfig {
    SyntheticConfig {
        n_customers,
        seed: 7,
        purchase_dropout: PurchaseDropoutParams {
            r: 0.8,
            alpha: 18.0,
            a: 0.6,
            b: 2.8,
        },
        monetary: MonetaryParams {
            p: 6.0,
            q: 4.0,
            v: 15.0,
        },
        acquisition_start: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        acquisition_spread_days: 90.0,
        observation_days: 270.0,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Full pipeline on a healthy synthetic population: one record per customer,
/// all probabilistic outputs within bounds, monetary model fitted, retention
/// diagonal exact.
#[test]
fn full_run_produces_coherent_report() {
    let synth = synth_config(400);
    let transactions = clv_core::synthetic::generate(&synth).unwrap();
    let config = AnalysisConfig::default();

    let report = run_analysis(&transactions, &config, synth.analysis_now()).unwrap();

    assert_eq!(report.customers.len(), 400);
    assert!(report.monetary_model_available());

    let ids: BTreeSet<&str> = report
        .customers
        .iter()
        .map(|c| c.customer_id.as_str())
        .collect();
    assert_eq!(ids.len(), 400, "one record per customer");

    for c in &report.customers {
        assert!(
            (0.0..=1.0).contains(&c.p_alive),
            "{}: p_alive={}",
            c.customer_id,
            c.p_alive
        );
        assert!(c.expected_future_transactions >= 0.0);
        assert!(c.recency_days >= 0.0 && c.recency_days <= c.t_days);
        if c.frequency == 0 {
            assert_eq!(c.monetary, None, "{}: no repeat, no monetary", c.customer_id);
        }
        let clv = c.predicted_clv.expect("monetary model available");
        assert!(clv >= 0.0, "{}: predicted_clv={clv}", c.customer_id);
        assert!(c.expected_avg_value.expect("value available") > 0.0);
    }

    for row in &report.retention.cohorts {
        assert_eq!(row.retention[0], 1.0, "cohort {} diagonal", row.cohort_id);
        assert!(row
            .retention
            .iter()
            .all(|f| (0.0..=1.0).contains(f)));
    }
}

/// With only one repeat customer the monetary fit is unidentifiable; the run
/// still completes on the purchase-dropout model alone and every value field
/// is explicitly unavailable rather than silently defaulted.
#[test]
fn run_degrades_cleanly_without_monetary_model() {
    let start = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
    let mut transactions: Vec<Transaction> = (0..30)
        .map(|i| Transaction::new(format!("solo-{i:02}"), start + Duration::days(i), 20.0))
        .collect();
    transactions.push(Transaction::new("repeat", start, 35.0));
    transactions.push(Transaction::new("repeat", start + Duration::days(45), 41.0));

    let report = run_analysis(
        &transactions,
        &AnalysisConfig::default(),
        start + Duration::days(120),
    )
    .unwrap();

    assert!(!report.monetary_model_available());
    assert_eq!(report.customers.len(), 31);
    for c in &report.customers {
        assert_eq!(c.expected_avg_value, None);
        assert_eq!(c.predicted_clv, None);
        assert!((0.0..=1.0).contains(&c.p_alive));
    }
}

/// The whole run is deterministic: same transactions, same anchor, same
/// config — bit-identical report.
#[test]
fn repeated_runs_are_identical() {
    let synth = synth_config(200);
    let transactions = clv_core::synthetic::generate(&synth).unwrap();
    let config = AnalysisConfig::default();

    let first = run_analysis(&transactions, &config, synth.analysis_now()).unwrap();
    let second = run_analysis(&transactions, &config, synth.analysis_now()).unwrap();

    assert_eq!(first.purchase_dropout, second.purchase_dropout);
    assert_eq!(first.monetary, second.monetary);
    assert_eq!(first.customers, second.customers);
    assert_eq!(first.retention, second.retention);
}

/// An empty transaction log has nothing to analyze.
#[test]
fn empty_log_is_rejected() {
    let result = run_analysis(&[], &AnalysisConfig::default(), Utc::now());
    assert!(result.is_err());
}

/// The report serializes cleanly for the external reporting collaborator.
#[test]
fn report_serializes_to_json() {
    let synth = synth_config(60);
    let transactions = clv_core::synthetic::generate(&synth).unwrap();

    let report = run_analysis(
        &transactions,
        &AnalysisConfig::default(),
        synth.analysis_now(),
    )
    .unwrap();

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("purchase_dropout"));
    assert!(json.contains("retention"));
}
