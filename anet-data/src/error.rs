use thiserror::Error;

/// Errors that stop an aggregation run before any output is produced.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("daylength threshold must be a finite, non-negative number of hours, got {0}")]
    InvalidThreshold(f64),

    #[error("zero-sum policy `all-zero-as-missing` discards genuine zero assimilation; set confirm_zero_as_missing to use it")]
    UnconfirmedZeroPolicy,

    #[error("no daylength thresholds given for the sensitivity run")]
    EmptyThresholdList,
}
