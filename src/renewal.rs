//! # Prediction Renewal
//!
//! The renewal scheduler keeps the published window ahead of the clock. On a
//! fixed cadence it asks whether the window is [`Freshness::Stale`] and, if so,
//! runs one fetch → parse → calibrate → publish → cache cycle.
//!
//! ## Retry policy
//! A failed cycle changes nothing: the old window stays published, the error
//! is logged, and the next tick simply tries again. There is no backoff and no
//! retry cap. The fetch window reaches days ahead, so the meter keeps serving
//! tides through long outages while the scheduler keeps retrying.
//!
//! ## Replacement, never merge
//! A successful cycle replaces the whole window. Overlapping fetches are never
//! reconciled, which keeps the window sorted and single-sourced by
//! construction.

use crate::cache;
use crate::noaa::{parse_predictions, PredictionSource};
use crate::task::TideTask;
use crate::window::PredictionWindow;
use crate::TideError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Whether the current window still reaches far enough into the future.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

/// Result of one scheduler tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenewOutcome {
    /// Window was fresh; nothing fetched
    Skipped,
    /// A new window with this many predictions was published
    Renewed(usize),
    /// Fetch or parse failed; the old window stays published
    Failed,
}

/// Handle to the running scheduler task.
pub struct RenewalHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl RenewalHandle {
    /// Ask the scheduler to stop and wait for it to finish its current tick.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.join.await {
            warn!(error = %err, "renewal task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl<S: PredictionSource> TideTask<S> {
    pub fn freshness_at(&self, now: DateTime<Utc>) -> Freshness {
        if self.should_renew_at(now) {
            Freshness::Stale
        } else {
            Freshness::Fresh
        }
    }

    /// True iff the window is empty or ends before `now + renew_threshold`.
    pub fn should_renew_at(&self, now: DateTime<Utc>) -> bool {
        match self.window().last() {
            None => true,
            Some(last) => now
                .checked_add_signed(self.renewal.renew_threshold())
                .map_or(true, |limit| last.time < limit),
        }
    }

    pub fn should_renew(&self) -> bool {
        self.should_renew_at(Utc::now())
    }

    /// Fetch, calibrate and publish a fresh window around the current time.
    pub async fn renew(&self) -> Result<usize, TideError> {
        self.renew_at(Utc::now()).await
    }

    /// Fetch, calibrate and publish a fresh window around `now`.
    ///
    /// The new window is published before it is cached, and a cache failure
    /// does not fail the renewal.
    pub async fn renew_at(&self, now: DateTime<Utc>) -> Result<usize, TideError> {
        let (Some(from), Some(to)) = (
            now.checked_sub_signed(self.renewal.window_back()),
            now.checked_add_signed(self.renewal.window_forward()),
        ) else {
            return Err(TideError::Config(format!(
                "prediction window around {now} is out of range"
            )));
        };

        let body = self.source.fetch(&self.station, from, to).await?;
        let raw = parse_predictions(&body)?;
        if raw.is_empty() {
            return Err(TideError::EmptyResponse);
        }
        let window = Arc::new(PredictionWindow::new(self.offset.apply_all(&raw))?);
        let count = window.len();

        if let (Some(first), Some(last)) = (window.first(), window.last()) {
            info!(
                count,
                first = %first.time,
                last = %last.time,
                "renewed tide predictions"
            );
        }

        self.publish(Arc::clone(&window));

        let path = self.renewal.cache_file.clone();
        let persisted =
            tokio::task::spawn_blocking(move || cache::store_best_effort(window.points(), &path))
                .await;
        if let Err(err) = persisted {
            warn!(error = %err, "prediction cache writer did not complete");
        }

        Ok(count)
    }

    /// One scheduler tick: renew if stale, never propagate failures.
    pub async fn run_once(&self) -> RenewOutcome {
        if !self.should_renew() {
            debug!("tide predictions are fresh");
            return RenewOutcome::Skipped;
        }
        match self.renew().await {
            Ok(count) => RenewOutcome::Renewed(count),
            Err(err) => {
                warn!(station = %self.station, error = %err, "error occurred querying tide predictions");
                RenewOutcome::Failed
            }
        }
    }

    /// Tick until `shutdown` flips to true or its sender is dropped.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.renewal.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            station = %self.station,
            interval_seconds = self.renewal.interval_seconds,
            "tide renewal started"
        );
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("tide renewal stopped");
    }

    /// Spawn the scheduler on the current tokio runtime.
    pub fn start(self: &Arc<Self>) -> RenewalHandle {
        let (shutdown, rx) = watch::channel(false);
        let join = tokio::spawn(Arc::clone(self).run(rx));
        RenewalHandle { shutdown, join }
    }
}
