//! # Station Calibration
//!
//! NOAA publishes predictions for a reference station. The meter usually sits
//! some distance away, where highs and lows arrive later and reach different
//! heights. Each extremum kind gets its own fixed correction:
//!
//! - **Time**: a signed shift in whole minutes, added to the prediction time
//! - **Level**: a factor the predicted level is multiplied by
//!
//! Offsets are deployment constants read from the config file; nothing here
//! is ever re-fitted at runtime.

use crate::{CalibratedTidePoint, Extreme, RawTidePoint, TideError};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Correction applied to one kind of extremum.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtremeOffset {
    /// Minutes added to the predicted time (may be negative)
    pub time_minutes: i64,
    /// Factor the predicted level is multiplied by
    pub level_factor: f64,
}

/// Largest time shift, either way, accepted for one extremum kind.
pub const MAX_TIME_SHIFT_MINUTES: i64 = 24 * 60;

impl ExtremeOffset {
    /// Offset that leaves predictions untouched.
    pub const IDENTITY: ExtremeOffset = ExtremeOffset {
        time_minutes: 0,
        level_factor: 1.0,
    };
}

/// Paired high/low corrections for one station.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use tide_meter_lib::calibration::{ExtremeOffset, TideOffset};
/// use tide_meter_lib::{Extreme, RawTidePoint};
///
/// let offset = TideOffset {
///     high: ExtremeOffset { time_minutes: 131, level_factor: 1.15 },
///     low: ExtremeOffset { time_minutes: 179, level_factor: 0.82 },
/// };
/// let raw = RawTidePoint {
///     time: Utc.with_ymd_and_hms(2024, 6, 16, 0, 0, 0).unwrap(),
///     level: 2.0,
///     extreme: Extreme::High,
/// };
/// let local = offset.apply(&raw);
/// assert_eq!(local.time, Utc.with_ymd_and_hms(2024, 6, 16, 2, 11, 0).unwrap());
/// assert_eq!(local.level, 2.0 * 1.15);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideOffset {
    pub high: ExtremeOffset,
    pub low: ExtremeOffset,
}

impl Default for TideOffset {
    fn default() -> Self {
        TideOffset {
            high: ExtremeOffset::IDENTITY,
            low: ExtremeOffset::IDENTITY,
        }
    }
}

impl TideOffset {
    /// The correction matching `extreme`.
    pub fn for_extreme(&self, extreme: Extreme) -> ExtremeOffset {
        match extreme {
            Extreme::High => self.high,
            Extreme::Low => self.low,
        }
    }

    /// Reject offsets that would turn valid predictions into unusable ones.
    pub fn validate(&self) -> Result<(), TideError> {
        for (kind, offset) in [("high", self.high), ("low", self.low)] {
            if !offset.level_factor.is_finite() {
                return Err(TideError::Config(format!(
                    "{kind} level factor must be a finite number, got {}",
                    offset.level_factor
                )));
            }
            if offset.time_minutes.abs() > MAX_TIME_SHIFT_MINUTES {
                return Err(TideError::Config(format!(
                    "{kind} time offset of {} minutes exceeds {MAX_TIME_SHIFT_MINUTES}",
                    offset.time_minutes
                )));
            }
        }
        Ok(())
    }

    /// Shift and scale a single prediction.
    pub fn apply(&self, point: &RawTidePoint) -> CalibratedTidePoint {
        let offset = self.for_extreme(point.extreme);
        CalibratedTidePoint {
            time: point.time + Duration::minutes(offset.time_minutes),
            level: point.level * offset.level_factor,
            extreme: point.extreme,
        }
    }

    /// Calibrate a whole response, preserving order.
    pub fn apply_all(&self, points: &[RawTidePoint]) -> Vec<CalibratedTidePoint> {
        points.iter().map(|p| self.apply(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn offset() -> TideOffset {
        TideOffset {
            high: ExtremeOffset {
                time_minutes: 131,
                level_factor: 1.15,
            },
            low: ExtremeOffset {
                time_minutes: -45,
                level_factor: 0.82,
            },
        }
    }

    fn raw(extreme: Extreme, level: f64) -> RawTidePoint {
        RawTidePoint {
            time: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            level,
            extreme,
        }
    }

    #[test]
    fn high_uses_high_offset() {
        let point = offset().apply(&raw(Extreme::High, 5.6));
        assert_eq!(point.time, Utc.with_ymd_and_hms(2025, 3, 1, 14, 11, 0).unwrap());
        assert_eq!(point.level, 5.6 * 1.15);
        assert_eq!(point.extreme, Extreme::High);
    }

    #[test]
    fn low_uses_low_offset_and_can_shift_backwards() {
        let point = offset().apply(&raw(Extreme::Low, -0.4));
        assert_eq!(point.time, Utc.with_ymd_and_hms(2025, 3, 1, 11, 15, 0).unwrap());
        assert_eq!(point.level, -0.4 * 0.82);
        assert_eq!(point.extreme, Extreme::Low);
    }

    #[test]
    fn apply_all_preserves_order_and_length() {
        let points = vec![raw(Extreme::Low, 1.0), raw(Extreme::High, 6.0)];
        let calibrated = offset().apply_all(&points);
        assert_eq!(calibrated.len(), 2);
        assert_eq!(calibrated[0].extreme, Extreme::Low);
        assert_eq!(calibrated[1].extreme, Extreme::High);
    }

    #[test]
    fn validate_rejects_unusable_offsets() {
        assert!(offset().validate().is_ok());
        assert!(TideOffset::default().validate().is_ok());

        let mut bad = offset();
        bad.high.level_factor = f64::NAN;
        assert!(matches!(bad.validate(), Err(TideError::Config(_))));

        let mut bad = offset();
        bad.low.level_factor = f64::INFINITY;
        assert!(matches!(bad.validate(), Err(TideError::Config(_))));

        let mut bad = offset();
        bad.low.time_minutes = -(MAX_TIME_SHIFT_MINUTES + 1);
        assert!(matches!(bad.validate(), Err(TideError::Config(_))));

        bad.low.time_minutes = -MAX_TIME_SHIFT_MINUTES;
        assert!(bad.validate().is_ok());
    }

    #[test]
    fn default_is_identity() {
        let point = raw(Extreme::High, 3.25);
        let calibrated = TideOffset::default().apply(&point);
        assert_eq!(calibrated.time, point.time);
        assert_eq!(calibrated.level, point.level);
    }
}
