//! # Tide State
//!
//! [`TideTask`] is the shared state every consumer talks to. It owns the
//! published [`PredictionWindow`] and answers "what is the tide right now?".
//!
//! ## Publishing windows
//! The window lives behind an `Arc` inside a `tokio::sync::watch` channel.
//! Renewal swaps in a new `Arc`; readers clone the current one at the start of
//! a lookup and use only that clone for the bracket search. A reader can
//! therefore see the old window or the new one, never a mix, and an old window
//! is freed once the last reader holding it is done.
//!
//! ## Waiting for a bracket
//! Right after a cold start (no cache) or when renewals have failed for long
//! enough that "now" has run off the end of the window, there is nothing to
//! interpolate. [`TideTask::await_tide_now`] then sleeps until either a new
//! window is published or the poll interval elapses, and checks again.
//! The poll keeps the reader moving when time, rather than a new window,
//! brings "now" back inside the data.
//!
//! The renewal half of this type lives in [`crate::renewal`].

use crate::cache;
use crate::calibration::TideOffset;
use crate::config::RenewalConfig;
use crate::noaa::PredictionSource;
use crate::window::PredictionWindow;
use crate::{TideError, TideSnapshot};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

/// Shared tide state for one station.
///
/// Wrap it in an `Arc`, call [`TideTask::start`] once to run renewals in the
/// background, and hand clones of the `Arc` to every consumer.
pub struct TideTask<S> {
    pub(crate) station: String,
    pub(crate) offset: TideOffset,
    pub(crate) renewal: RenewalConfig,
    pub(crate) source: S,
    window: watch::Sender<Arc<PredictionWindow>>,
}

impl<S: PredictionSource> TideTask<S> {
    /// Create the tide state, seeding it from the cache file when one exists.
    ///
    /// A missing or corrupt cache starts the meter with an empty window; only
    /// an inconsistent renewal configuration is an error.
    pub fn new(
        station: impl Into<String>,
        offset: TideOffset,
        renewal: RenewalConfig,
        source: S,
    ) -> Result<Self, TideError> {
        renewal.validate()?;
        offset.validate()?;

        let cached = cache::load_or_empty(&renewal.cache_file);
        // load() already checks ordering; this only guards the type invariant
        let window = PredictionWindow::new(cached).unwrap_or_else(|err| {
            warn!(error = %err, "discarding cached predictions");
            PredictionWindow::empty()
        });
        let (window, _) = watch::channel(Arc::new(window));

        Ok(TideTask {
            station: station.into(),
            offset,
            renewal,
            source,
            window,
        })
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    /// The currently published window.
    pub fn window(&self) -> Arc<PredictionWindow> {
        Arc::clone(&self.window.borrow())
    }

    /// Swap in a new window and wake every waiting reader.
    pub(crate) fn publish(&self, window: Arc<PredictionWindow>) {
        self.window.send_replace(window);
    }

    /// Tide at `time` from the current window, without waiting.
    pub fn tide_at(&self, time: DateTime<Utc>) -> Option<TideSnapshot> {
        self.window().tide_at(time)
    }

    pub fn tide_now(&self) -> Option<TideSnapshot> {
        self.tide_at(Utc::now())
    }

    /// Wait until the current time is bracketed by the window, then return the
    /// interpolated tide.
    ///
    /// Never returns while the window cannot answer; use
    /// [`TideTask::await_tide_now_timeout`] to bound the wait.
    pub async fn await_tide_now(&self) -> TideSnapshot {
        let mut updates = self.window.subscribe();
        loop {
            let window = Arc::clone(&updates.borrow_and_update());
            if let Some(snapshot) = window.tide_at(Utc::now()) {
                return snapshot;
            }
            drop(window);

            debug!(station = %self.station, "waiting for tide predictions to cover now");
            // Sender lives as long as self, so changed() only returns on a new window
            let _ = timeout(self.renewal.reader_poll(), updates.changed()).await;
        }
    }

    /// [`TideTask::await_tide_now`] with an upper bound on the wait.
    pub async fn await_tide_now_timeout(&self, limit: Duration) -> Option<TideSnapshot> {
        let deadline = Instant::now() + limit;
        tokio::time::timeout_at(deadline, self.await_tide_now())
            .await
            .ok()
    }
}
