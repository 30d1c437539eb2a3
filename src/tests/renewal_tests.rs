//! # Renewal Scheduler Tests
//!
//! Exercise the scheduler and the tide state together against scripted
//! prediction sources: windows are replaced whole, failures leave the old
//! window serving, and readers always see one window or the other.

use super::{noaa_response, ScriptedSource};
use crate::cache;
use crate::calibration::TideOffset;
use crate::config::{Config, RenewalConfig};
use crate::renewal::RenewOutcome;
use crate::task::TideTask;
use crate::Extreme;
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;

fn renewal(dir: &TempDir) -> RenewalConfig {
    let mut renewal = Config::default().renewal;
    renewal.cache_file = dir.path().join("tides.txt");
    renewal.interval_seconds = 1;
    renewal.reader_poll_millis = 10;
    renewal
}

/// A week of extrema starting a day before `now`, with levels offset by
/// `base` so windows from different fetches are easy to tell apart.
fn week_around(now: DateTime<Utc>, base: f64) -> Vec<(DateTime<Utc>, f64, Extreme)> {
    (0..32)
        .map(|i| {
            let time = now - Duration::days(1) + Duration::minutes(i * 372);
            if i % 2 == 0 {
                (time, base, Extreme::Low)
            } else {
                (time, base + 5.0, Extreme::High)
            }
        })
        .collect()
}

/// Test that a successful renewal replaces a populated window entirely.
#[tokio::test]
async fn renewal_replaces_whole_window() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now();
    let source = ScriptedSource::new(vec![
        Some(noaa_response(&week_around(now, 0.0)[..6])),
        Some(noaa_response(&week_around(now, 100.0))),
    ]);
    let task = TideTask::new("9414290", TideOffset::default(), renewal(&dir), source).unwrap();

    assert_eq!(task.renew_at(now).await.unwrap(), 6);
    let old = task.window();
    assert_eq!(old.len(), 6);

    assert_eq!(task.renew_at(now).await.unwrap(), 32);
    let new = task.window();
    assert_eq!(new.len(), 32);
    assert!(new.points().iter().all(|p| p.level >= 100.0));
    // The previous window is untouched for anyone still holding it
    assert_eq!(old.len(), 6);
    assert!(old.points().iter().all(|p| p.level < 100.0));
}

/// Test that renewal writes the cache and a restarted meter serves from it.
#[tokio::test]
async fn renewal_persists_for_next_startup() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now();
    let source = ScriptedSource::new(vec![Some(noaa_response(&week_around(now, 1.0)))]);
    let task = TideTask::new("9414290", TideOffset::default(), renewal(&dir), source).unwrap();
    task.renew_at(now).await.unwrap();

    let cached = cache::load(&dir.path().join("tides.txt")).expect("Renewal should write cache");
    assert_eq!(cached.as_slice(), task.window().points());

    let restarted = TideTask::new(
        "9414290",
        TideOffset::default(),
        renewal(&dir),
        ScriptedSource::new(vec![]),
    )
    .unwrap();
    assert_eq!(restarted.window().points(), task.window().points());
    assert!(restarted.tide_now().is_some());
    assert!(!restarted.should_renew());
}

/// Test that an outage keeps the last good window serving readers.
#[tokio::test]
async fn outage_keeps_serving_previous_window() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now();
    // Short window so it stays stale and every tick fetches
    let source = ScriptedSource::new(vec![
        Some(noaa_response(&week_around(now, 2.0)[..8])),
        None,
        None,
    ]);
    let task = TideTask::new("9414290", TideOffset::default(), renewal(&dir), source).unwrap();

    assert_eq!(task.run_once().await, RenewOutcome::Renewed(8));
    let served = task.window();
    assert_eq!(task.run_once().await, RenewOutcome::Failed);
    assert_eq!(task.run_once().await, RenewOutcome::Failed);
    assert!(Arc::ptr_eq(&served, &task.window()));
    assert!(task.tide_now().is_some());
    assert_eq!(task.source.calls.load(Ordering::SeqCst), 3);
}

/// Test a cold start: readers block until the background scheduler publishes.
#[tokio::test]
async fn cold_start_reader_waits_for_first_renewal() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now();
    let source = ScriptedSource::new(vec![None, Some(noaa_response(&week_around(now, 3.0)))]);
    let task = Arc::new(
        TideTask::new("9414290", TideOffset::default(), renewal(&dir), source).unwrap(),
    );
    assert!(task.tide_now().is_none());

    let reader = {
        let task = Arc::clone(&task);
        tokio::spawn(async move { task.await_tide_now().await })
    };

    // First tick fails, second (one second later) succeeds
    let handle = task.start();
    let tide = tokio::time::timeout(std::time::Duration::from_secs(5), reader)
        .await
        .expect("Reader should be released by the second renewal")
        .unwrap();
    handle.shutdown().await;

    assert!(tide.level >= 3.0 && tide.level <= 8.0);
    assert!(task.source.calls.load(Ordering::SeqCst) >= 2);
}

/// Test that readers racing a renewal see exactly one window per snapshot.
///
/// Old and new windows have levels in disjoint ranges, so a snapshot mixing
/// them would have one bracket point from each.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_readers_never_mix_windows() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now();
    let mut responses = Vec::new();
    for round in 0..20 {
        responses.push(Some(noaa_response(&week_around(now, 100.0 * round as f64))));
    }
    let task = Arc::new(
        TideTask::new(
            "9414290",
            TideOffset::default(),
            renewal(&dir),
            ScriptedSource::new(responses),
        )
        .unwrap(),
    );
    task.renew_at(now).await.unwrap();

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let task = Arc::clone(&task);
            tokio::spawn(async move {
                let mut snapshots = Vec::new();
                for _ in 0..200 {
                    snapshots.push(task.await_tide_now().await);
                    tokio::task::yield_now().await;
                }
                snapshots
            })
        })
        .collect();

    for _ in 1..20 {
        task.renew_at(now).await.unwrap();
        tokio::task::yield_now().await;
    }

    for reader in readers {
        for tide in reader.await.unwrap() {
            let round = (tide.prev.level / 100.0).floor();
            assert_eq!(
                round,
                (tide.next.level / 100.0).floor(),
                "snapshot straddles two windows: {tide}"
            );
            assert!(tide.level >= round * 100.0 && tide.level <= round * 100.0 + 5.0);
        }
    }
}
