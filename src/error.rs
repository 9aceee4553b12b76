//! Error type shared by every fallible operation in the crate.

use thiserror::Error;

/// Everything that can go wrong while configuring or running a chain.
///
/// All variants describe a precondition violated by caller-supplied input.
/// None of them are retried internally.
#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("Proposal bandwidth must be positive and finite, got {0}")]
    InvalidBandwidth(f64),

    #[error("Start state must be finite, got {0}")]
    InvalidStart(f64),

    #[error("Iteration count must be positive, got {0}")]
    InvalidIterations(usize),

    #[error("Target density returned a negative value {value} at state {state}")]
    NegativeDensity { state: String, value: f64 },

    #[error("Target density returned a non-finite value {value} at state {state}")]
    NonFiniteDensity { state: String, value: f64 },

    #[error("Thinning interval must be positive, got {0}")]
    InvalidThin(usize),

    #[error("No samples left to summarize: chain of length {len} with burn-in {burn_in}")]
    EmptySummary { len: usize, burn_in: usize },

    #[error("Quantile must lie in [0, 1], got {0}")]
    InvalidQuantile(f64),

    #[error("Number of chains must be positive, got {0}")]
    InvalidChainCount(usize),

    #[error("R-hat needs at least two chains of equal length (>= 2), got lengths {0:?}")]
    MismatchedChains(Vec<usize>),

    #[error("States must all have {expected} coordinates, found one with {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Invalid model parameters: {0}")]
    InvalidModel(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "csv")]
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, SamplerError>;
