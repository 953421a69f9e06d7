//! SQLite persistence for the runner.
//!
//! RULE: only store.rs talks to the database. The core engine never sees a
//! connection — it takes plain transaction slices and hands back plain
//! records, and this module moves them in and out of SQLite.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clv_core::{pipeline::CustomerRecord, Transaction};
use rusqlite::{params, Connection};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS run (
    run_id     TEXT PRIMARY KEY,
    seed       INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS transactions (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id      TEXT NOT NULL,
    customer_id TEXT NOT NULL,
    timestamp   TEXT NOT NULL,
    amount      REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_txn_run ON transactions (run_id, customer_id, timestamp);

CREATE TABLE IF NOT EXISTS customer_results (
    run_id                       TEXT NOT NULL,
    customer_id                  TEXT NOT NULL,
    recency_days                 REAL NOT NULL,
    frequency                    INTEGER NOT NULL,
    t_days                       REAL NOT NULL,
    monetary                     REAL,
    p_alive                      REAL NOT NULL,
    expected_future_transactions REAL NOT NULL,
    expected_avg_value           REAL,
    predicted_clv                REAL,
    segment                      TEXT NOT NULL,
    PRIMARY KEY (run_id, customer_id)
);
";

pub struct AnalysisStore {
    conn: Connection,
}

impl AnalysisStore {
    /// Open (or create) the analysis database at `path`.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("opening database {path}"))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn insert_run(&self, run_id: &str, seed: u64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, seed, created_at) VALUES (?1, ?2, ?3)",
            params![run_id, seed as i64, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn insert_transactions(&mut self, run_id: &str, transactions: &[Transaction]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO transactions (run_id, customer_id, timestamp, amount)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for t in transactions {
                stmt.execute(params![
                    run_id,
                    t.customer_id,
                    t.timestamp.to_rfc3339(),
                    t.amount
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn transaction_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Load every stored transaction, ordered by (customer, time) so the
    /// per-customer streams satisfy the engine's ordering invariant.
    pub fn load_transactions(&self) -> Result<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT customer_id, timestamp, amount FROM transactions
             ORDER BY customer_id ASC, timestamp ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let ts: String = row.get(1)?;
            Ok((row.get::<_, String>(0)?, ts, row.get::<_, f64>(2)?))
        })?;

        let mut transactions = Vec::new();
        for row in rows {
            let (customer_id, ts, amount) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&ts)
                .with_context(|| format!("bad timestamp {ts} for {customer_id}"))?
                .with_timezone(&Utc);
            transactions.push(Transaction::new(customer_id, timestamp, amount));
        }
        Ok(transactions)
    }

    pub fn save_customer_records(
        &mut self,
        run_id: &str,
        records: &[CustomerRecord],
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO customer_results
                 (run_id, customer_id, recency_days, frequency, t_days, monetary, p_alive,
                  expected_future_transactions, expected_avg_value, predicted_clv, segment)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for r in records {
                stmt.execute(params![
                    run_id,
                    r.customer_id,
                    r.recency_days,
                    r.frequency as i64,
                    r.t_days,
                    r.monetary,
                    r.p_alive,
                    r.expected_future_transactions,
                    r.expected_avg_value,
                    r.predicted_clv,
                    r.segment.label(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
