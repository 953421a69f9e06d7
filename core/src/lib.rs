//! clv-core — customer lifetime value estimation engine.
//!
//! Turns a raw transaction log into per-customer RFM summaries, two fitted
//! probabilistic models (purchase-dropout timing and per-transaction spend),
//! a discounted lifetime-value estimate per customer, behavioral segments,
//! and cohort retention views. No file, database, or terminal I/O happens in
//! the analysis path — collaborators feed transactions in and serialize the
//! report out.

pub mod clv;
pub mod cohort;
pub mod config;
pub mod error;
pub mod math;
pub mod monetary;
pub mod optimizer;
pub mod pipeline;
pub mod purchase_dropout;
pub mod rfm;
pub mod segmentation;
pub mod synthetic;
pub mod transaction;
pub mod types;

pub use clv::ClvEstimate;
pub use config::{AnalysisConfig, CohortBucket};
pub use error::{ClvError, ClvResult};
pub use monetary::MonetaryParams;
pub use pipeline::{run_analysis, AnalysisReport, CustomerRecord};
pub use purchase_dropout::PurchaseDropoutParams;
pub use rfm::RfmProfile;
pub use segmentation::Segment;
pub use transaction::Transaction;
