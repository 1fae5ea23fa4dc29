//! Error types for interval-related analysis.

use thiserror::Error;

/// Errors returned by [`crate::interval::IntervalAggregator`].
#[derive(Error, Debug)]
pub enum IntervalError {
    /// The input tables are not shaped the way the aggregator needs them,
    /// e.g. the `ECG_Rate` column is missing or ambiguous.
    #[error("wrong input for column `{column}`: {reason}")]
    InvalidInput { column: String, reason: String },

    /// A metric returned by the variability routine does not reduce to a single scalar.
    #[error("cannot coerce metric `{column}` to a scalar: routine returned {rows} rows")]
    Coercion { column: String, rows: usize },

    /// Failure inside the variability routine, passed through unchanged.
    #[error(transparent)]
    Variability(#[from] anyhow::Error),
}

impl IntervalError {
    pub(crate) fn invalid_input(column: impl Into<String>, reason: impl Into<String>) -> Self {
        IntervalError::InvalidInput {
            column: column.into(),
            reason: reason.into(),
        }
    }
}

pub type IntervalResult<T> = std::result::Result<T, IntervalError>;
