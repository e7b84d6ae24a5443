//! Error type shared by the sampler, the data loaders and the chain summaries.

use thiserror::Error;

/// Boxed error returned by user-supplied cost functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("parameter vector must have at least one entry")]
    EmptyParameters,

    #[error("initial point has {initial} parameters but {scales} proposal scales were given")]
    DimensionMismatch { initial: usize, scales: usize },

    #[error("proposal scale {index} is {value}; scales must be finite and non-negative")]
    InvalidScale { index: usize, value: f64 },

    #[error("initial parameter {index} is {value}; the starting point must be finite")]
    NonFiniteInitial { index: usize, value: f64 },

    /// Both the current and the proposed position lie in a forbidden region.
    #[error("step {step}: current and proposed positions are both infeasible")]
    DegenerateCost { step: usize },

    #[error("step {step}: cost function returned {value}")]
    InvalidCost { step: usize, value: f64 },

    #[error("step {step}: cost function failed")]
    CostFailure {
        step: usize,
        #[source]
        source: BoxError,
    },

    #[error("cannot discard {burn_in} samples from a chain of {len}")]
    BurnInTooLong { burn_in: usize, len: usize },

    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("line {line}, column {column}: cannot parse {token:?} as a number")]
    Parse {
        line: usize,
        column: usize,
        token: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "csv")]
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
