//! # Error Types
//!
//! Two error families exist because they are handled in opposite ways:
//!
//! - [`TideError`] fails a renewal attempt. The scheduler logs it, leaves the
//!   published window untouched and tries again on the next tick.
//! - [`CacheError`] is never surfaced past the cache module's best-effort
//!   wrappers. It only decides how loudly the failure gets logged.

use std::io;
use thiserror::Error;

/// Errors that can occur while fetching, parsing or publishing predictions.
#[derive(Error, Debug)]
pub enum TideError {
    /// HTTP request failed (network, TLS, timeout or protocol error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("prediction service returned HTTP {0}")]
    Status(u16),

    /// Response header lacks a column we locate by name
    #[error("response is missing column `{0}`")]
    MissingColumn(&'static str),

    /// Data row has fewer fields than the header promised
    #[error("line {line}: row is missing fields")]
    ShortRow { line: usize },

    #[error("line {line}: invalid timestamp `{value}`")]
    Timestamp { line: usize, value: String },

    #[error("line {line}: invalid level `{value}`")]
    Level { line: usize, value: String },

    #[error("line {line}: invalid extremum marker `{value}`")]
    Extreme { line: usize, value: String },

    /// Response parsed cleanly but contained no predictions
    #[error("response contained no predictions")]
    EmptyResponse,

    /// Points are not strictly increasing in time
    #[error("prediction {index} is not later than the one before it")]
    Unordered { index: usize },

    /// Level is NaN or infinite
    #[error("prediction {index} has a non-finite level")]
    NonFinite { index: usize },

    /// Deployment configuration is inconsistent
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Outcome of a failed cache read or write.
///
/// `NotFound` and `Corrupt` are expected on a fresh install or after a crash;
/// `Io` points at something wrong with the host (permissions, full disk).
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache file not found")]
    NotFound,

    #[error("cache line {line} is corrupt: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error("cache IO: {0}")]
    Io(io::Error),
}

impl From<io::Error> for CacheError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => CacheError::NotFound,
            _ => CacheError::Io(err),
        }
    }
}
