//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the tide-config.toml file.
//! It provides a centralized way to configure the NOAA station, the local calibration
//! offsets, the renewal schedule, and the display and announcer consumers.

use crate::calibration::{ExtremeOffset, TideOffset};
use crate::leds::LedLayout;
use crate::TideError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Application configuration loaded from tide-config.toml
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// NOAA station configuration
    pub station: StationConfig,
    /// Local correction applied to the reference station's predictions
    pub calibration: CalibrationConfig,
    /// Prediction window and renewal schedule
    pub renewal: RenewalConfig,
    /// LED indicator configuration
    pub display: DisplayConfig,
    /// Voice announcer configuration
    pub announcer: AnnouncerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// NOAA tide station configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StationConfig {
    /// NOAA station ID (e.g., "9414290" for San Francisco, CA)
    pub id: String,
    /// Human-readable station name for reference
    pub name: String,
    /// HTTP request timeout in seconds
    pub request_timeout_seconds: u64,
}

/// Per-extremum time shift (minutes) and level factor.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct CalibrationConfig {
    pub high_time_offset_minutes: i64,
    pub low_time_offset_minutes: i64,
    pub high_level_factor: f64,
    pub low_level_factor: f64,
}

/// Prediction window bounds and renewal cadence.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenewalConfig {
    /// How far into the past each fetch reaches
    pub window_back_hours: i64,
    /// How far into the future each fetch reaches
    pub window_forward_hours: i64,
    /// Renew once the last prediction is closer than this to "now"
    pub renew_threshold_hours: i64,
    /// Seconds between staleness checks
    pub interval_seconds: u64,
    /// Cache file for the calibrated window
    pub cache_file: PathBuf,
    /// Upper bound in milliseconds on how long a waiting reader sleeps between checks
    pub reader_poll_millis: u64,
}

/// LED indicator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    pub low_leds: usize,
    pub high_leds: usize,
    pub level_leds: usize,
    /// Tide level (feet) represented by the first level indicator
    pub min_led_level: i32,
    /// Index into the display mode cycle shown at startup
    pub mode: usize,
}

/// Voice announcer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnnouncerConfig {
    pub enabled: bool,
    /// Seconds between announcer checks
    pub interval_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset (e.g. "info", "tide_meter_lib=debug")
    pub level: String,
    /// Seconds between tide log lines
    pub tide_log_interval_seconds: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            tide_log_interval_seconds: 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            station: StationConfig {
                id: "9414290".to_string(),
                name: "San Francisco, CA".to_string(),
                request_timeout_seconds: 30,
            },
            calibration: CalibrationConfig {
                high_time_offset_minutes: 131,
                low_time_offset_minutes: 179,
                high_level_factor: 1.15,
                low_level_factor: 0.82,
            },
            renewal: RenewalConfig {
                window_back_hours: 24,
                window_forward_hours: 7 * 24,
                renew_threshold_hours: 24,
                interval_seconds: 60,
                cache_file: PathBuf::from("tides.txt"),
                reader_poll_millis: 1000,
            },
            display: DisplayConfig {
                low_leds: 2,
                high_leds: 2,
                level_leds: 12,
                min_led_level: -2,
                mode: 0,
            },
            announcer: AnnouncerConfig {
                enabled: true,
                interval_seconds: 10,
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from tide-config.toml file
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path("tide-config.toml")
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(station = %config.station.name, "loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(error = %e, "invalid config file format, using default configuration");
                    Self::default()
                }
            },
            Err(_) => {
                info!("no config file found, using default configuration");
                Self::default()
            }
        }
    }

    /// Save current configuration to tide-config.toml
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to_path("tide-config.toml")
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }

    /// Calibration offsets as the engine consumes them.
    pub fn tide_offset(&self) -> TideOffset {
        let c = &self.calibration;
        TideOffset {
            high: ExtremeOffset {
                time_minutes: c.high_time_offset_minutes,
                level_factor: c.high_level_factor,
            },
            low: ExtremeOffset {
                time_minutes: c.low_time_offset_minutes,
                level_factor: c.low_level_factor,
            },
        }
    }

    pub fn led_layout(&self) -> LedLayout {
        LedLayout {
            low_leds: self.display.low_leds,
            high_leds: self.display.high_leds,
            level_leds: self.display.level_leds,
            min_led_level: self.display.min_led_level,
        }
    }
}

/// Upper bound on every hour setting (ten years).
pub const MAX_WINDOW_HOURS: i64 = 10 * 366 * 24;

impl RenewalConfig {
    pub fn window_back(&self) -> chrono::Duration {
        chrono::Duration::hours(self.window_back_hours)
    }

    pub fn window_forward(&self) -> chrono::Duration {
        chrono::Duration::hours(self.window_forward_hours)
    }

    pub fn renew_threshold(&self) -> chrono::Duration {
        chrono::Duration::hours(self.renew_threshold_hours)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn reader_poll(&self) -> Duration {
        Duration::from_millis(self.reader_poll_millis)
    }

    /// Reject schedules that could never become fresh.
    ///
    /// A threshold at or beyond the forward window would mark every freshly
    /// fetched window stale again immediately.
    pub fn validate(&self) -> Result<(), TideError> {
        if self.window_back_hours < 0 {
            return Err(TideError::Config(
                "window_back_hours must not be negative".to_string(),
            ));
        }
        if self.window_forward_hours <= 0 || self.renew_threshold_hours <= 0 {
            return Err(TideError::Config(
                "window_forward_hours and renew_threshold_hours must be positive".to_string(),
            ));
        }
        let longest = self
            .window_back_hours
            .max(self.window_forward_hours)
            .max(self.renew_threshold_hours);
        if longest > MAX_WINDOW_HOURS {
            return Err(TideError::Config(format!(
                "window and threshold hours must not exceed {MAX_WINDOW_HOURS}, got {longest}"
            )));
        }
        if self.renew_threshold_hours >= self.window_forward_hours {
            return Err(TideError::Config(format!(
                "renew_threshold_hours ({}) must be less than window_forward_hours ({})",
                self.renew_threshold_hours, self.window_forward_hours
            )));
        }
        if self.interval_seconds == 0 || self.reader_poll_millis == 0 {
            return Err(TideError::Config(
                "interval_seconds and reader_poll_millis must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
