//! Integration tests for the fleet-core crate.
//!
//! These exercise the registry and the statistics functions together the
//! way the HTTP layer composes them, including loading from disk and
//! heavy concurrent appends.

use std::io::Write;
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use fleet_core::registry::DeviceRegistry;
use fleet_core::stats::{average_upload_duration, uptime};

const SEC: i64 = 1_000_000_000;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 8, 0, 0).unwrap()
}

fn write_csv(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("devices-")
        .suffix(".csv")
        .tempfile()
        .expect("temp file");
    file.write_all(contents.as_bytes()).expect("write csv");
    file
}

// ---------------------------------------------------------------------------
// 1. Loading from disk
// ---------------------------------------------------------------------------

#[test]
fn load_three_devices_from_file() {
    let file = write_csv("device_id\n60-6b-44-84-dc-64\nb4-45-52-a2-f1-3c\n26-9a-66-01-33-83\n");

    let registry = DeviceRegistry::new();
    let added = registry.load_devices_from_csv(file.path()).expect("load");

    assert_eq!(added, 3);
    assert_eq!(
        registry.device_ids(),
        vec!["26-9a-66-01-33-83", "60-6b-44-84-dc-64", "b4-45-52-a2-f1-3c"]
    );
}

#[test]
fn load_from_file_with_blank_lines() {
    let file = write_csv("device_id\ndevice-1\n\ndevice-2\n\n");

    let registry = DeviceRegistry::new();
    registry.load_devices_from_csv(file.path()).expect("load");

    assert!(registry.exists("device-1"));
    assert!(registry.exists("device-2"));
    assert!(!registry.exists(""));
}

#[test]
fn load_missing_file_fails() {
    let dir = tempfile::tempdir().expect("temp dir");
    let registry = DeviceRegistry::new();

    let err = registry
        .load_devices_from_csv(dir.path().join("nonexistent-file.csv"))
        .unwrap_err();

    assert!(err.is_load_failure());
    assert!(registry.is_empty());
}

// ---------------------------------------------------------------------------
// 2. Registry + statistics composition
// ---------------------------------------------------------------------------

#[test]
fn stats_from_snapshot() {
    let registry = DeviceRegistry::new();
    registry.load_devices("device_id\ncam-1\n".as_bytes()).unwrap();

    // Out-of-order arrival: t+3m, t, t+1m, t+2m, t+4m
    for minute in [3, 0, 1, 2, 4] {
        registry
            .append_heartbeat("cam-1", base() + TimeDelta::minutes(minute))
            .unwrap();
    }
    for secs in [3, 6, 9] {
        registry.append_upload_duration("cam-1", secs * SEC).unwrap();
    }

    let snap = registry.snapshot("cam-1").unwrap();
    assert_eq!(uptime(&snap.heartbeats), 125.0);
    assert_eq!(average_upload_duration(&snap.upload_durations), "6s");

    // Computing stats must not reorder what the registry holds
    let again = registry.snapshot("cam-1").unwrap();
    assert_eq!(again.heartbeats[0], base() + TimeDelta::minutes(3));
}

#[test]
fn stats_for_silent_device() {
    let registry = DeviceRegistry::new();
    registry.load_devices("device_id\nquiet\n".as_bytes()).unwrap();

    let snap = registry.snapshot("quiet").unwrap();
    assert!(snap.is_empty());
    assert_eq!(uptime(&snap.heartbeats), 0.0);
    assert_eq!(average_upload_duration(&snap.upload_durations), "0s");
}

// ---------------------------------------------------------------------------
// 3. Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_appends_to_one_device_are_not_lost() {
    const THREADS: usize = 16;
    const PER_THREAD: usize = 500;

    let registry = Arc::new(DeviceRegistry::new());
    registry.load_devices("device_id\nhot\n".as_bytes()).unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let offset = (t * PER_THREAD + i) as i64;
                    registry
                        .append_heartbeat("hot", base() + TimeDelta::seconds(offset))
                        .unwrap();
                    registry.append_upload_duration("hot", offset).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    let snap = registry.snapshot("hot").unwrap();
    assert_eq!(snap.heartbeats.len(), THREADS * PER_THREAD);
    assert_eq!(snap.upload_durations.len(), THREADS * PER_THREAD);

    // Every value exactly once
    let mut durations = snap.upload_durations.clone();
    durations.sort_unstable();
    let expected: Vec<i64> = (0..(THREADS * PER_THREAD) as i64).collect();
    assert_eq!(durations, expected);
}

#[test]
fn snapshots_during_writes_are_never_torn() {
    let registry = Arc::new(DeviceRegistry::new());
    registry.load_devices("device_id\npaired\nother\n".as_bytes()).unwrap();

    let writer = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for i in 0..2_000i64 {
                // heartbeat first, so a snapshot can be at most one ahead
                registry
                    .append_heartbeat("paired", base() + TimeDelta::seconds(i))
                    .unwrap();
                registry.append_upload_duration("paired", i).unwrap();
                registry.append_upload_duration("other", i).unwrap();
            }
        })
    };

    let mut last_len = 0;
    for _ in 0..500 {
        let snap = registry.snapshot("paired").unwrap();
        let hb = snap.heartbeats.len();
        let up = snap.upload_durations.len();
        assert!(hb == up || hb == up + 1, "torn snapshot: {hb} vs {up}");
        assert!(hb >= last_len, "snapshot went backwards");
        last_len = hb;
        // prefix property: values arrive in order from a single writer
        for (i, d) in snap.upload_durations.iter().enumerate() {
            assert_eq!(*d, i as i64);
        }
    }

    writer.join().expect("writer thread panicked");
    assert_eq!(registry.snapshot("other").unwrap().upload_durations.len(), 2_000);
}

#[test]
fn concurrent_appends_across_devices() {
    let ids: Vec<String> = (0..8).map(|i| format!("dev-{i}")).collect();
    let csv = format!("device_id\n{}\n", ids.join("\n"));

    let registry = Arc::new(DeviceRegistry::new());
    assert_eq!(registry.load_devices(csv.as_bytes()).unwrap(), 8);

    let handles: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for minute in 0..5 {
                    registry
                        .append_heartbeat(&id, base() + TimeDelta::minutes(minute))
                        .unwrap();
                }
                // unknown ids interleaved with real traffic
                assert!(registry.append_heartbeat("ghost", base()).is_err());
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    for id in &ids {
        let snap = registry.snapshot(id).unwrap();
        assert_eq!(uptime(&snap.heartbeats), 125.0);
    }
    assert!(!registry.exists("ghost"));
}
