//! clv-runner: headless lifetime-value analysis runner.
//!
//! Usage:
//!   clv-runner --seed 42 --customers 2000 --db analysis.db
//!   clv-runner --db analysis.db --config config.json --report report.json

mod store;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use clv_core::{
    synthetic::{self, SyntheticConfig},
    AnalysisConfig, MonetaryParams, PurchaseDropoutParams, Segment,
};
use std::env;
use store::AnalysisStore;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let customers = parse_arg(&args, "--customers", 2000usize);
    let db = string_arg(&args, "--db").unwrap_or_else(|| ":memory:".to_string());
    let config_path = string_arg(&args, "--config");
    let report_path = string_arg(&args, "--report").unwrap_or_else(|| "analysis_report.json".to_string());

    println!("clv-runner — customer lifetime value analysis");
    println!("  seed:      {seed}");
    println!("  customers: {customers}");
    println!("  db:        {db}");
    println!("  report:    {report_path}");
    println!();

    let config = match config_path {
        Some(path) => AnalysisConfig::load(&path)?,
        None => AnalysisConfig::default(),
    };

    let mut store = if db == ":memory:" {
        AnalysisStore::in_memory()?
    } else {
        AnalysisStore::open(&db)?
    };
    store.migrate()?;

    let run_id = format!("run-{}", uuid::Uuid::new_v4());
    store.insert_run(&run_id, seed)?;

    // Reuse stored transactions when the database already has them;
    // otherwise seed it with a fresh synthetic log.
    let synth = sample_config(customers, seed);
    let (transactions, now) = if store.transaction_count()? > 0 {
        log::info!("loading existing transactions from {db}");
        let txns = store.load_transactions()?;
        let now = txns
            .iter()
            .map(|t| t.timestamp)
            .max()
            .unwrap_or_else(Utc::now)
            + chrono::Duration::days(1);
        (txns, now)
    } else {
        log::info!("generating synthetic transactions (seed {seed})");
        let txns = synthetic::generate(&synth)?;
        store.insert_transactions(&run_id, &txns)?;
        (txns, synth.analysis_now())
    };

    let report = clv_core::run_analysis(&transactions, &config, now)?;

    store.save_customer_records(&run_id, &report.customers)?;
    std::fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;

    print_summary(&report);
    println!("\nFull report written to {report_path}");
    Ok(())
}

fn print_summary(report: &clv_core::AnalysisReport) {
    let n = report.customers.len();
    println!("Customers analyzed: {n}");

    let pd = &report.purchase_dropout;
    println!(
        "Purchase-dropout fit: r={:.4} alpha={:.4} a={:.4} b={:.4}",
        pd.r, pd.alpha, pd.a, pd.b
    );
    match &report.monetary {
        Some(m) => println!("Monetary fit:         p={:.4} q={:.4} v={:.4}", m.p, m.q, m.v),
        None => println!("Monetary fit:         unavailable (too few repeat customers)"),
    }

    let mut clv_total = 0.0;
    let mut clv_count = 0usize;
    for segment in [
        Segment::Champion,
        Segment::Loyal,
        Segment::Promising,
        Segment::AtRisk,
        Segment::Dormant,
    ] {
        let members = report
            .customers
            .iter()
            .filter(|c| c.segment == segment)
            .count();
        println!("  {:<10} {members}", segment.label());
    }
    for c in &report.customers {
        if let Some(clv) = c.predicted_clv {
            clv_total += clv;
            clv_count += 1;
        }
    }
    if clv_count > 0 {
        println!(
            "Mean predicted CLV:   {:.2} over {} customers",
            clv_total / clv_count as f64,
            clv_count
        );
    }

    println!("Cohorts: {}", report.retention.cohorts.len());
    for row in report.retention.cohorts.iter().take(6) {
        let cells: Vec<String> = row
            .retention
            .iter()
            .take(8)
            .map(|f| format!("{f:.2}"))
            .collect();
        println!("  {:<10} n={:<5} [{}]", row.cohort_id, row.size, cells.join(", "));
    }
}

/// Ground-truth parameters for the synthetic sample dataset.
fn sample_config(n_customers: usize, seed: u64) -> SyntheticConfig {
    SyntheticConfig {
        n_customers,
        seed,
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
        acquisition_start: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        acquisition_spread_days: 120.0,
        observation_days: 365.0,
    }
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].clone())
}
