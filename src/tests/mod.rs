//! Cross-module tests: the prediction pipeline from NOAA text to tide
//! snapshot, and the renewal scheduler working against live readers.

mod renewal_tests;

use crate::noaa::{PredictionSource, HEADER_LEVEL, HEADER_TIME, HEADER_TYPE};
use crate::{Extreme, TideError};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Render `(time, level, extreme)` rows as a NOAA tab-separated response.
pub(crate) fn noaa_response(rows: &[(DateTime<Utc>, f64, Extreme)]) -> String {
    let mut text = format!("station_id\t{HEADER_TIME}\t{HEADER_LEVEL}\t{HEADER_TYPE}\n");
    for (time, level, extreme) in rows {
        text.push_str(&format!(
            "urn:ioos:station:NOAA.NOS.CO-OPS:9414290\t{}\t{}\t{}\n",
            time.format(crate::cache::TIME_FORMAT),
            level,
            extreme
        ));
    }
    text
}

/// Replays queued responses in order; `None` entries fail like an outage.
/// Once the queue is empty every fetch fails.
pub(crate) struct ScriptedSource {
    responses: Mutex<VecDeque<Option<String>>>,
    pub(crate) calls: AtomicUsize,
}

impl ScriptedSource {
    pub(crate) fn new(responses: Vec<Option<String>>) -> Self {
        ScriptedSource {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }
}

impl PredictionSource for ScriptedSource {
    fn fetch(
        &self,
        _station: &str,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> impl Future<Output = Result<String, TideError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .flatten();
        async move { next.ok_or(TideError::Status(503)) }
    }
}
