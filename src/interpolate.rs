//! # Tide Level Interpolation
//!
//! Predictions only tell us when the water turns. Between a low and the
//! following high the level is estimated with a half-period sine ease:
//!
//! ```text
//! ease(t) = (1 + sin((t - 0.5) * PI)) / 2        t in [0, 1]
//! level   = prev.level + (next.level - prev.level) * ease(t)
//! ```
//!
//! The curve is flat at both ends, which matches how the tide slows to a
//! stand near each extremum, and steepest at mid-tide. Linear interpolation
//! would put a kink at every high and low.
//!
//! Extrapolation is refused: [`find_pair`] returns `None` outside the window so
//! callers wait for a renewal instead of projecting past the last prediction.

use crate::CalibratedTidePoint;
use chrono::{DateTime, Utc};
use std::f64::consts::PI;

/// Sine ease mapping `[0, 1]` onto `[0, 1]` with zero slope at both ends.
pub fn ease(t: f64) -> f64 {
    (1.0 + ((t - 0.5) * PI).sin()) / 2.0
}

/// Interpolated level at `time` between two bracketing extrema.
///
/// Exactly `prev.level` at `prev.time` and exactly `next.level` at
/// `next.time`. In between the result never leaves the range spanned by the
/// two levels.
///
/// # Panics
/// Panics if `prev.time >= next.time` or if `time` lies outside
/// `[prev.time, next.time]`. Both mean the window feeding us was not sorted
/// or the caller skipped [`find_pair`].
pub fn level(prev: &CalibratedTidePoint, next: &CalibratedTidePoint, time: DateTime<Utc>) -> f64 {
    assert!(
        prev.time < next.time,
        "degenerate tide bracket: {} is not before {}",
        prev.time,
        next.time
    );
    assert!(
        prev.time <= time && time <= next.time,
        "query time {} lies outside bracket [{}, {}]",
        time,
        prev.time,
        next.time
    );

    if time == prev.time {
        return prev.level;
    }
    if time == next.time {
        return next.level;
    }

    let span = (next.time - prev.time).num_milliseconds() as f64;
    let elapsed = (time - prev.time).num_milliseconds() as f64;
    let t = elapsed / span;

    let blended = prev.level + (next.level - prev.level) * ease(t);
    let (lo, hi) = if prev.level <= next.level {
        (prev.level, next.level)
    } else {
        (next.level, prev.level)
    };
    blended.clamp(lo, hi)
}

/// Find the consecutive pair of points whose interval contains `time`.
///
/// Returns the first matching pair, so a query landing exactly on an interior
/// extremum is answered by the interval that ends there.
pub fn find_pair(
    points: &[CalibratedTidePoint],
    time: DateTime<Utc>,
) -> Option<(&CalibratedTidePoint, &CalibratedTidePoint)> {
    points
        .windows(2)
        .find(|w| w[0].time <= time && time <= w[1].time)
        .map(|w| (&w[0], &w[1]))
}
