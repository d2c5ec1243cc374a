//! Error types for geefetch core

use thiserror::Error;

/// Main error type for geefetch core operations.
///
/// Apart from `Io`, every variant is raised while validating user input,
/// before any remote request is issued.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid date: {value} ({reason})")]
    InvalidDate { value: String, reason: String },

    #[error("Invalid date range: end {end} is before start {start}")]
    InvalidRange { start: String, end: String },

    #[error("Invalid period: {value} ({reason})")]
    InvalidPeriod { value: String, reason: String },

    #[error("Unknown index: {name} (available: {available})")]
    UnknownIndex { name: String, available: String },

    #[error("Unknown band: {name} for sensor {sensor}")]
    UnknownBand { name: String, sensor: &'static str },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    #[error("Area of interest is empty")]
    EmptyAoi,
}

/// Result type alias for geefetch core operations
pub type Result<T> = std::result::Result<T, Error>;
