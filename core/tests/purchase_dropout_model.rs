use clv_core::{
    purchase_dropout::{self, PurchaseDropoutParams},
    RfmProfile,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn profile(frequency: u64, recency_days: f64, t_days: f64) -> RfmProfile {
    RfmProfile {
        customer_id: "c".to_string(),
        frequency,
        recency_days,
        t_days,
        monetary: None,
    }
}

fn reference_params() -> PurchaseDropoutParams {
    PurchaseDropoutParams {
        r: 0.5,
        alpha: 10.0,
        a: 0.3,
        b: 5.0,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Concrete scenario from the contract: purchases on days [0, 30, 65]
/// observed at T=100 give frequency=2, recency=65; with params
/// (r=0.5, α=10, a=0.3, b=5) the alive probability is strictly inside (0, 1)
/// and identical across evaluations — scoring has no randomness.
#[test]
fn alive_probability_for_reference_scenario() {
    let p = profile(2, 65.0, 100.0);
    let params = reference_params();

    let first = purchase_dropout::probability_alive(&p, &params);
    assert!(
        first > 0.0 && first < 1.0,
        "p_alive={first} must be strictly between 0 and 1"
    );

    for _ in 0..10 {
        let again = purchase_dropout::probability_alive(&p, &params);
        assert_eq!(first.to_bits(), again.to_bits(), "scoring must be deterministic");
    }
}

/// With no repeat purchase there has been no dropout opportunity, so the
/// model says the customer is alive with certainty.
#[test]
fn zero_frequency_customer_is_certainly_alive() {
    let p = profile(0, 0.0, 80.0);
    let alive = purchase_dropout::probability_alive(&p, &reference_params());
    assert!((alive - 1.0).abs() < 1e-12, "p_alive={alive}");
}

/// A long purchase gap (low recency relative to T) must lower the alive
/// probability compared to a recently active customer.
#[test]
fn stale_customer_less_likely_alive() {
    let params = reference_params();
    let recent = purchase_dropout::probability_alive(&profile(4, 95.0, 100.0), &params);
    let stale = purchase_dropout::probability_alive(&profile(4, 20.0, 100.0), &params);
    assert!(
        recent > stale,
        "recent ({recent}) must beat stale ({stale})"
    );
}

/// Expected future transactions is non-negative and zero for a zero-length
/// horizon.
#[test]
fn expected_transactions_bounds() {
    let params = reference_params();
    let p = profile(3, 60.0, 100.0);

    let none = purchase_dropout::expected_future_transactions(&p, &params, 0.0);
    assert_eq!(none, 0.0);

    let some = purchase_dropout::expected_future_transactions(&p, &params, 180.0);
    assert!(some >= 0.0, "expected transactions {some} must be ≥ 0");
    assert!(some.is_finite());
}

/// Monotonicity: holding recency and T fixed, more observed repeats must not
/// predict fewer future transactions.
#[test]
fn expected_transactions_monotone_in_frequency() {
    let params = reference_params();
    let mut previous = -1.0;
    for frequency in 0..12 {
        let e = purchase_dropout::expected_future_transactions(
            &profile(frequency, 50.0, 100.0),
            &params,
            90.0,
        );
        assert!(
            e >= previous - 1e-12,
            "expected transactions dropped from {previous} to {e} at frequency {frequency}"
        );
        previous = e;
    }
}

/// A longer horizon can only add expected transactions.
#[test]
fn expected_transactions_monotone_in_horizon() {
    let params = reference_params();
    let p = profile(2, 65.0, 100.0);
    let mut previous = 0.0;
    for days in [30.0, 60.0, 120.0, 240.0, 480.0] {
        let e = purchase_dropout::expected_future_transactions(&p, &params, days);
        assert!(
            e >= previous,
            "horizon {days}d gave {e}, less than shorter horizon's {previous}"
        );
        previous = e;
    }
}

/// The closed-form likelihood is finite for ordinary observations, including
/// frequency-0 customers, who must contribute to the fit.
#[test]
fn likelihood_finite_for_all_customer_kinds() {
    let params = reference_params();
    for p in [
        profile(0, 0.0, 40.0),
        profile(1, 12.0, 40.0),
        profile(9, 38.0, 40.0),
    ] {
        let ll = purchase_dropout::log_likelihood(&params, &p);
        assert!(ll.is_finite(), "log-likelihood {ll} for {p:?}");
        assert!(ll < 0.0, "a log-probability should be negative, got {ll}");
    }
}
