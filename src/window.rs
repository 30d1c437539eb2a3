//! # Prediction Window
//!
//! A [`PredictionWindow`] is the ordered run of calibrated extrema the meter
//! is currently working from. It is validated once at construction (strictly
//! increasing times) and never modified afterwards; a renewal builds a new
//! window and swaps it in whole.

use crate::interpolate::{find_pair, level};
use crate::{CalibratedTidePoint, Extreme, TideError};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::fmt;

/// Immutable, time-ordered sequence of calibrated predictions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PredictionWindow {
    points: Vec<CalibratedTidePoint>,
}

impl PredictionWindow {
    /// Build a window, rejecting any point that is not strictly later than the
    /// one before it or whose level is not a finite number.
    pub fn new(points: Vec<CalibratedTidePoint>) -> Result<Self, TideError> {
        if let Some(index) = points.iter().position(|p| !p.level.is_finite()) {
            return Err(TideError::NonFinite { index });
        }
        if let Some(index) = points
            .windows(2)
            .position(|w| w[1].time <= w[0].time)
        {
            return Err(TideError::Unordered { index: index + 1 });
        }
        Ok(PredictionWindow { points })
    }

    pub fn empty() -> Self {
        PredictionWindow::default()
    }

    pub fn points(&self) -> &[CalibratedTidePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&CalibratedTidePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&CalibratedTidePoint> {
        self.points.last()
    }

    /// Interpolated tide at `time`, or `None` when `time` is outside the window.
    pub fn tide_at(&self, time: DateTime<Utc>) -> Option<TideSnapshot> {
        let (prev, next) = find_pair(&self.points, time)?;
        Some(TideSnapshot {
            prev: *prev,
            next: *next,
            level: level(prev, next, time),
            time,
        })
    }
}

/// The tide at one instant: bracketing extrema plus the interpolated level.
///
/// Derived on every query, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TideSnapshot {
    /// Extremum at or before `time`
    pub prev: CalibratedTidePoint,
    /// Extremum at or after `time`
    pub next: CalibratedTidePoint,
    /// Interpolated level in feet
    pub level: f64,
    /// Instant the snapshot was taken for
    pub time: DateTime<Utc>,
}

impl TideSnapshot {
    /// True when the water is heading towards a high.
    pub fn is_rising(&self) -> bool {
        self.next.extreme == Extreme::High
    }
}

impl fmt::Display for TideSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "prev=[{}], next=[{}], level={:.2}, {}, time={}",
            self.prev,
            self.next,
            self.level,
            if self.is_rising() { "rising" } else { "falling" },
            self.time.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        )
    }
}
