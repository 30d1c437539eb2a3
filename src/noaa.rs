//! # NOAA High/Low Tide Predictions
//!
//! Predictions come from the CO-OPS SOS endpoint as tab-separated text:
//!
//! ```text
//! station_id  ...  time_ISO8601          sea_surface_height_...[feet]  type
//! urn:...     ...  2024-06-16T03:12:00Z  5.16                          H
//! ```
//!
//! Columns are located by header name, never by position, so extra or
//! reordered columns in the response do not break parsing. Any missing column
//! or unparseable field fails the whole response; the renewal scheduler then
//! keeps its current window and retries on the next tick.
//!
//! The network call sits behind [`PredictionSource`] so the scheduler can be
//! exercised without a network.

use crate::cache::TIME_FORMAT;
use crate::{Extreme, RawTidePoint, TideError};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// CO-OPS Sensor Observation Service endpoint.
pub const SOS_URL: &str = "https://tidesandcurrents.noaa.gov/ioos-dif-sos/SOS";

pub const HEADER_TIME: &str = "time_ISO8601";
pub const HEADER_LEVEL: &str = "sea_surface_height_amplitude_due_to_equilibrium_ocean_tide [feet]";
pub const HEADER_TYPE: &str = "type";

/// Something that can answer "what are the highs and lows for this station
/// between these two instants", returning the raw response body.
pub trait PredictionSource: Send + Sync + 'static {
    fn fetch(
        &self,
        station: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Future<Output = Result<String, TideError>> + Send;
}

/// HTTP client for the NOAA CO-OPS SOS service.
#[derive(Clone, Debug)]
pub struct NoaaSource {
    client: reqwest::Client,
    url: String,
}

impl NoaaSource {
    /// Client with the given request timeout against the public endpoint.
    pub fn new(timeout: Duration) -> Result<Self, TideError> {
        Self::with_url(SOS_URL, timeout)
    }

    pub fn with_url(url: impl Into<String>, timeout: Duration) -> Result<Self, TideError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tide-meter/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(NoaaSource {
            client,
            url: url.into(),
        })
    }
}

impl PredictionSource for NoaaSource {
    fn fetch(
        &self,
        station: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Future<Output = Result<String, TideError>> + Send {
        let offering = format!("urn:ioos:station:NOAA.NOS.CO-OPS:{station}");
        let event_time = format!("{}/{}", from.format(TIME_FORMAT), to.format(TIME_FORMAT));
        let request = self.client.get(&self.url).query(&[
            ("service", "SOS"),
            ("request", "GetObservation"),
            ("version", "1.0.0"),
            (
                "observedProperty",
                "sea_surface_height_amplitude_due_to_equilibrium_ocean_tide",
            ),
            ("offering", offering.as_str()),
            ("responseFormat", "text/tab-separated-values"),
            ("eventTime", event_time.as_str()),
            ("result", "VerticalDatum==urn:ioos:def:datum:noaa::MLLW"),
            ("dataType", "HighLowTidePredictions"),
            ("unit", "Feet"),
        ]);

        async move {
            debug!(%event_time, "requesting tide predictions");
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(TideError::Status(status.as_u16()));
            }
            Ok(response.text().await?)
        }
    }
}

/// Parse a tab-separated prediction response.
///
/// Blank lines are skipped. Line numbers in errors are 1-based and count the
/// header as line 1.
pub fn parse_predictions(text: &str) -> Result<Vec<RawTidePoint>, TideError> {
    let mut lines = text.lines();
    let header: Vec<&str> = lines
        .next()
        .unwrap_or_default()
        .split('\t')
        .map(str::trim)
        .collect();

    let column = |name: &'static str| {
        header
            .iter()
            .position(|h| *h == name)
            .ok_or(TideError::MissingColumn(name))
    };
    let pos_time = column(HEADER_TIME)?;
    let pos_level = column(HEADER_LEVEL)?;
    let pos_type = column(HEADER_TYPE)?;

    let mut points = Vec::new();
    for (idx, row) in lines.enumerate() {
        let line = idx + 2;
        if row.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = row.split('\t').map(str::trim).collect();
        let field = |pos: usize| fields.get(pos).copied().ok_or(TideError::ShortRow { line });

        let time = field(pos_time)?;
        let level = field(pos_level)?;
        let marker = field(pos_type)?;

        let time = NaiveDateTime::parse_from_str(time, TIME_FORMAT)
            .map_err(|_| TideError::Timestamp {
                line,
                value: time.to_string(),
            })?
            .and_utc();
        // f64::from_str accepts "NaN" and "inf"; neither is a tide
        let level = level
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| TideError::Level {
                line,
                value: level.to_string(),
            })?;
        let extreme = Extreme::from_marker(marker).ok_or_else(|| TideError::Extreme {
            line,
            value: marker.to_string(),
        })?;

        points.push(RawTidePoint {
            time,
            level,
            extreme,
        });
    }

    Ok(points)
}
