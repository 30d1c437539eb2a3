//! Spoken tide announcements.
//!
//! The announcer compares each snapshot with the previous one and decides
//! whether anything is worth saying: the tide turning, or the level crossing
//! a whole foot. Producing the audio is someone else's job; this module picks
//! the words and logs them.

use crate::noaa::PredictionSource;
use crate::task::TideTask;
use crate::TideSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct Announcer {
    sound_on: bool,
    prev: Option<TideSnapshot>,
}

impl Announcer {
    pub fn new(sound_on: bool) -> Self {
        Announcer {
            sound_on,
            prev: None,
        }
    }

    pub fn sound_on(&self) -> bool {
        self.sound_on
    }

    /// Flip the sound setting and return the confirmation to speak.
    pub fn toggle(&mut self) -> String {
        self.sound_on = !self.sound_on;
        format!(
            "The sound is now turned {}.",
            if self.sound_on { "on" } else { "off" }
        )
    }

    /// Record `tide` and return what to say about it, if anything.
    ///
    /// The snapshot is remembered even while the sound is off so that turning
    /// it back on does not replay a stale change.
    pub fn observe(&mut self, tide: &TideSnapshot) -> Option<String> {
        let prev = self.prev.replace(*tide)?;
        if !self.sound_on {
            return None;
        }

        if prev.is_rising() != tide.is_rising() {
            let turned = if prev.is_rising() { "high" } else { "low" };
            return Some(format!(
                "It is now {} tide. The water level is {:.2} feet.",
                turned, tide.prev.level
            ));
        }

        if tide.level.trunc() != prev.level.trunc() {
            let feet = tide.level.round() as i64;
            let unit = if feet == 1 { "foot" } else { "feet" };
            return Some(format!("The water level is {} {}.", feet, unit));
        }

        None
    }

    /// Check the tide every `every` and log whatever there is to say, flipping
    /// the sound on each message from `toggles`.
    ///
    /// Each tick takes the tide without waiting, so a toggle is handled
    /// straight away even while the window cannot answer. Returns the final
    /// state once `toggles` is closed.
    pub async fn run<S: PredictionSource>(
        mut self,
        task: Arc<TideTask<S>>,
        every: Duration,
        mut toggles: mpsc::UnboundedReceiver<()>,
    ) -> Self {
        let mut ticker = tokio::time::interval(every);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match task.tide_now() {
                        Some(tide) => {
                            if let Some(message) = self.observe(&tide) {
                                info!(target: "tide_meter::announcer", "{message}");
                            }
                        }
                        None => debug!("announcer has no tide to report yet"),
                    }
                }
                toggle = toggles.recv() => {
                    if toggle.is_none() {
                        return self;
                    }
                    let message = self.toggle();
                    info!(target: "tide_meter::announcer", "{message}");
                }
            }
        }
    }
}
