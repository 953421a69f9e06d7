use chrono::{DateTime, Duration, TimeZone, Utc};
use clv_core::{error::ClvError, rfm, Transaction};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn day(offset: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::days(offset)
}

fn txn(customer: &str, day_offset: i64, amount: f64) -> Transaction {
    Transaction::new(customer, day(day_offset), amount)
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Frequency counts repeat purchases only; recency runs first → last purchase;
/// T runs first purchase → analysis date; monetary averages repeat spend.
#[test]
fn rfm_definitions_match_contract() {
    let transactions = vec![
        txn("c1", 0, 100.0),
        txn("c1", 30, 40.0),
        txn("c1", 65, 60.0),
    ];

    let profiles = rfm::summarize(&transactions, day(100)).unwrap();
    assert_eq!(profiles.len(), 1);

    let p = &profiles[0];
    assert_eq!(p.frequency, 2, "3 transactions = 2 repeats");
    assert!((p.recency_days - 65.0).abs() < 1e-9, "recency={}", p.recency_days);
    assert!((p.t_days - 100.0).abs() < 1e-9, "T={}", p.t_days);
    // Mean of the two repeat amounts only; the first purchase is excluded.
    assert!((p.monetary.unwrap() - 50.0).abs() < 1e-9);
}

/// A single-purchase customer has frequency 0 and no monetary observation —
/// explicitly None, never zero.
#[test]
fn single_purchase_customer_has_no_monetary() {
    let transactions = vec![txn("solo", 10, 75.0)];

    let profiles = rfm::summarize(&transactions, day(50)).unwrap();
    let p = &profiles[0];

    assert_eq!(p.frequency, 0);
    assert_eq!(p.monetary, None);
    assert!((p.recency_days - 0.0).abs() < 1e-9);
    assert!((p.t_days - 40.0).abs() < 1e-9);
}

/// Profiles come back sorted by customer_id, one per customer.
#[test]
fn profiles_sorted_and_complete() {
    let transactions = vec![
        txn("zeta", 0, 10.0),
        txn("alpha", 1, 10.0),
        txn("mid", 2, 10.0),
        txn("alpha", 5, 20.0),
    ];

    let profiles = rfm::summarize(&transactions, day(30)).unwrap();
    let ids: Vec<&str> = profiles.iter().map(|p| p.customer_id.as_str()).collect();
    assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
}

/// A non-positive amount is contradictory input and aborts the run.
#[test]
fn non_positive_amount_is_fatal() {
    let transactions = vec![txn("c1", 0, 50.0), txn("c1", 10, -5.0)];

    let err = rfm::summarize(&transactions, day(30)).unwrap_err();
    assert!(
        matches!(err, ClvError::DataValidation { .. }),
        "expected DataValidation, got {err:?}"
    );
}

/// A per-customer stream that runs backwards in time is fatal too.
#[test]
fn out_of_order_stream_is_fatal() {
    let transactions = vec![txn("c1", 20, 50.0), txn("c1", 5, 30.0)];

    let err = rfm::summarize(&transactions, day(30)).unwrap_err();
    assert!(matches!(err, ClvError::DataValidation { .. }));
}

/// A customer whose first purchase postdates the analysis anchor is an
/// individual anomaly: skipped with a warning, while the rest of the
/// population is still summarized.
#[test]
fn inconsistent_customer_is_skipped_not_fatal() {
    let transactions = vec![
        txn("good", 0, 20.0),
        txn("good", 10, 25.0),
        txn("future", 80, 99.0),
    ];

    // Anchor at day 50: "future" hasn't been acquired yet.
    let profiles = rfm::summarize(&transactions, day(50)).unwrap();
    let ids: Vec<&str> = profiles.iter().map(|p| p.customer_id.as_str()).collect();
    assert_eq!(ids, vec!["good"], "anomalous customer must be excluded");
}
