//! # Tide Meter Core Library
//!
//! This library estimates the current tide level and trend for a single station
//! from sparse high/low tide predictions. Predictions are fetched periodically
//! from NOAA, corrected with fixed per-station offsets, cached on disk, and
//! interpolated into a continuous level between the two bracketing extrema.
//!
//! ## Design Philosophy
//!
//! ### Readers never wait on I/O
//! - **Immutable windows**: every renewal builds a fresh [`window::PredictionWindow`]
//!   and publishes it behind an `Arc`; nothing is ever edited in place
//! - **Single writer**: the network fetch and the cache write only happen inside
//!   the background renewal task
//! - **Blocking query**: [`task::TideTask::await_tide_now`] waits for a bracketing
//!   pair to exist, then interpolates against one consistent window
//!
//! ### Data Flow
//! 1. **Startup**: load the cache file (missing or corrupt → empty window)
//! 2. **Renewal**: fetch NOAA TSV → parse → calibrate → validate → publish → cache
//! 3. **Query**: bracket search → eased interpolation → [`TideSnapshot`]
//!
//! ## Core Types
//!
//! - [`Extreme`]: whether a prediction is a high or a low tide
//! - [`RawTidePoint`]: a prediction exactly as NOAA published it
//! - [`CalibratedTidePoint`]: a prediction after local time/level correction
//! - [`TideSnapshot`]: the interpolated "tide now" handed to consumers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// Module declarations
pub mod announcer;
pub mod cache;
pub mod calibration;
pub mod config;
pub mod error;
pub mod interpolate;
pub mod leds;
pub mod noaa;
pub mod renderer;
pub mod renewal;
pub mod task;
pub mod window;

#[cfg(test)]
mod tests;

pub use error::{CacheError, TideError};
pub use window::TideSnapshot;

/// Kind of tidal extremum a prediction describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Extreme {
    High,
    Low,
}

impl Extreme {
    /// Single-letter marker used by NOAA and by the cache file.
    pub fn marker(self) -> char {
        match self {
            Extreme::High => 'H',
            Extreme::Low => 'L',
        }
    }

    /// Parse a `H`/`L` marker. Anything else is rejected.
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "H" => Some(Extreme::High),
            "L" => Some(Extreme::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Extreme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.marker())
    }
}

/// A high or low tide prediction as published by the remote source.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use tide_meter_lib::{Extreme, RawTidePoint};
///
/// let point = RawTidePoint {
///     time: Utc.with_ymd_and_hms(2024, 6, 16, 3, 12, 0).unwrap(),
///     level: 5.42,
///     extreme: Extreme::High,
/// };
/// assert_eq!(point.extreme.marker(), 'H');
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawTidePoint {
    /// Predicted time of the extremum
    pub time: DateTime<Utc>,
    /// Predicted level in feet above MLLW
    pub level: f64,
    pub extreme: Extreme,
}

/// A prediction after the station offsets have been applied.
///
/// This is the unit that gets cached, published in a window and interpolated
/// over. Build one through [`calibration::TideOffset::apply`] or by loading the
/// cache.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibratedTidePoint {
    /// Locally corrected time of the extremum
    pub time: DateTime<Utc>,
    /// Locally corrected level in feet
    pub level: f64,
    pub extreme: Extreme,
}

impl fmt::Display for CalibratedTidePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "time={}, level={:.2}, type={}",
            self.time.format(cache::TIME_FORMAT),
            self.level,
            self.extreme
        )
    }
}
