//! # Prediction Cache
//!
//! The calibrated window is written to a small text file after every renewal
//! so a restart (or a restart during a network outage) can serve tides
//! straight away. One record per line:
//!
//! ```text
//! 2024-06-16T03:12:00Z 5.934 H
//! 2024-06-16T09:40:00Z -0.2952 L
//! ```
//!
//! Levels are written with Rust's shortest round-tripping float formatting, so
//! `load(store(x)) == x` holds exactly.
//!
//! The cache is an optimisation, never a source of truth. [`load_or_empty`] and
//! [`store_best_effort`] swallow every failure and only log it, at a level
//! that depends on whether the failure was expected.

use crate::{CacheError, CalibratedTidePoint, Extreme};
use chrono::NaiveDateTime;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Timestamp layout shared by the cache file and the NOAA response.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Write `points` to `path`, replacing any previous cache.
///
/// The file is written next to its destination and renamed into place, so a
/// reader never sees a half-written cache.
pub fn store(points: &[CalibratedTidePoint], path: &Path) -> Result<(), CacheError> {
    let mut text = String::with_capacity(points.len() * 32);
    for p in points {
        // Writing into a String cannot fail
        let _ = writeln!(
            text,
            "{} {} {}",
            p.time.format(TIME_FORMAT),
            p.level,
            p.extreme.marker()
        );
    }

    let tmp = temp_path(path);
    fs::write(&tmp, text).map_err(CacheError::Io)?;
    fs::rename(&tmp, path).map_err(CacheError::Io)?;
    Ok(())
}

/// Read a cache file written by [`store`].
pub fn load(path: &Path) -> Result<Vec<CalibratedTidePoint>, CacheError> {
    let text = fs::read_to_string(path)?;
    let mut points: Vec<CalibratedTidePoint> = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let point = parse_record(line, line_no)?;
        // Hand-edited or mixed-up files must not break the window invariant
        if let Some(prev) = points.last() {
            if point.time <= prev.time {
                return Err(CacheError::Corrupt {
                    line: line_no,
                    reason: "record is not later than the one before it".to_string(),
                });
            }
        }
        points.push(point);
    }

    Ok(points)
}

/// Load the cache, treating every failure as "no cache".
pub fn load_or_empty(path: &Path) -> Vec<CalibratedTidePoint> {
    match load(path) {
        Ok(points) => {
            info!(count = points.len(), path = %path.display(), "loaded cached predictions");
            points
        }
        Err(CacheError::NotFound) => {
            debug!(path = %path.display(), "no prediction cache yet");
            Vec::new()
        }
        Err(err @ CacheError::Corrupt { .. }) => {
            warn!(path = %path.display(), error = %err, "ignoring corrupt prediction cache");
            Vec::new()
        }
        Err(err) => {
            error!(path = %path.display(), error = %err, "could not read prediction cache");
            Vec::new()
        }
    }
}

/// Store the cache, logging and swallowing any failure.
pub fn store_best_effort(points: &[CalibratedTidePoint], path: &Path) {
    match store(points, path) {
        Ok(()) => {
            info!(count = points.len(), path = %path.display(), "stored predictions");
        }
        Err(err) => {
            error!(path = %path.display(), error = %err, "skipping prediction cache write");
        }
    }
}

fn parse_record(line: &str, line_no: usize) -> Result<CalibratedTidePoint, CacheError> {
    let corrupt = |reason: String| CacheError::Corrupt {
        line: line_no,
        reason,
    };

    let fields: Vec<&str> = line.split_whitespace().collect();
    let [time, level, marker] = fields.as_slice() else {
        return Err(corrupt(format!("expected 3 fields, found {}", fields.len())));
    };

    let time = NaiveDateTime::parse_from_str(time, TIME_FORMAT)
        .map_err(|e| corrupt(format!("timestamp `{time}`: {e}")))?
        .and_utc();
    let level = level
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| corrupt(format!("level `{level}`")))?;
    let extreme = Extreme::from_marker(marker).ok_or_else(|| corrupt(format!("marker `{marker}`")))?;

    Ok(CalibratedTidePoint {
        time,
        level,
        extreme,
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
