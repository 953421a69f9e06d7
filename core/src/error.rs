use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClvError {
    #[error("Invalid transaction data: {reason}")]
    DataValidation { reason: String },

    #[error("Too few qualifying customers for the {model} fit: got {got}, need {need}")]
    InsufficientData {
        model: &'static str,
        got: usize,
        need: usize,
    },

    #[error("Optimizer did not converge within {iterations} iterations (tolerance {tolerance:e})")]
    NonConvergence { iterations: usize, tolerance: f64 },

    #[error("Fit converged to a degenerate parameter set: {reason}")]
    InvalidParameter { reason: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ClvResult<T> = Result<T, ClvError>;
