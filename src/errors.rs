//! Errors
//!
//! Custom error types used throughout the `picover` crate.
use thiserror::Error;

/// Errors that can occur while evaluating randomized prediction intervals.
#[derive(Debug, Error)]
pub enum CoverageError {
    /// Observation-aligned arrays disagree in length.
    #[error("Length mismatch in {0}: {1} rows against {2} outcomes.")]
    LengthMismatch(String, usize, usize),
    /// An interval row violates the lower <= upper contract or is non-finite.
    #[error("Invalid interval at row {0}: [{1}, {2}].")]
    InvalidInterval(usize, f64, f64),
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// An operation received no observations to work with.
    #[error("Empty input: {0} contains no observations.")]
    EmptyData(String),
    /// A split result record does not match the artifact contract.
    #[error("Malformed split record {0}: {1}")]
    MalformedRecord(usize, String),
    /// Unable to read data or artifacts from a file.
    #[error("Unable to read from a file: {0}")]
    UnableToRead(String),
    /// Unable to write a figure to file.
    #[error("Unable to write to file: {0}")]
    UnableToWrite(String),
}
