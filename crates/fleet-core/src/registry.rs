//! Thread-safe store of registered devices and their raw samples.
//!
//! Locking is two-level:
//!   - an outer `RwLock` guards the id -> record map; it is only
//!     write-locked while a device list is being committed
//!   - each record owns a `Mutex` over its two sample sequences, so traffic
//!     for one device never waits on another
//!
//! Lookups clone the record's `Arc` and drop the outer guard before the
//! record lock is taken. No lock is held across I/O, logging or any
//! statistics computation.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{RegistryError, Result};

/// Registry of known devices. Construct one per process (or per test) and
/// share it behind an `Arc`.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, Arc<DeviceRecord>>>,
}

#[derive(Default)]
struct DeviceRecord {
    samples: Mutex<Samples>,
}

#[derive(Default)]
struct Samples {
    heartbeats: Vec<DateTime<Utc>>,
    upload_durations: Vec<i64>,
}

impl DeviceRecord {
    // Every critical section is a single push or clone, so a poisoned lock
    // never guards half-written data.
    fn lock(&self) -> MutexGuard<'_, Samples> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Independent copy of one device's samples, in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceSnapshot {
    pub heartbeats: Vec<DateTime<Utc>>,
    /// Upload durations in nanoseconds
    pub upload_durations: Vec<i64>,
}

impl DeviceSnapshot {
    /// True when the device has reported neither heartbeats nor uploads.
    pub fn is_empty(&self) -> bool {
        self.heartbeats.is_empty() && self.upload_durations.is_empty()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every device listed in the CSV file at `path`.
    pub fn load_devices_from_csv(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| RegistryError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let added = self.load_devices(file)?;
        info!(path = %path.display(), added, total = self.len(), "Loaded device list");
        debug!(devices = ?self.device_ids(), "Registered devices");
        Ok(added)
    }

    /// Register every device listed in `reader` with empty sample sequences.
    ///
    /// The whole source is parsed before anything is committed: a malformed
    /// source leaves the registry exactly as it was. Blank identifiers are
    /// skipped, and ids that are already registered keep their samples.
    /// Returns the number of newly registered devices.
    pub fn load_devices<R: Read>(&self, reader: R) -> Result<usize> {
        let ids = read_device_ids(reader)?;

        let added = {
            let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
            let mut added = 0;
            for id in ids {
                if let Entry::Vacant(slot) = devices.entry(id) {
                    slot.insert(Arc::default());
                    added += 1;
                }
            }
            added
        };

        debug!(added, "Committed device ids");
        Ok(added)
    }

    pub fn exists(&self, device_id: &str) -> bool {
        self.read_map().contains_key(device_id)
    }

    pub fn append_heartbeat(&self, device_id: &str, sent_at: DateTime<Utc>) -> Result<()> {
        let record = self.record(device_id)?;
        record.lock().heartbeats.push(sent_at);
        Ok(())
    }

    /// Record one upload duration, in nanoseconds.
    pub fn append_upload_duration(&self, device_id: &str, nanos: i64) -> Result<()> {
        let record = self.record(device_id)?;
        record.lock().upload_durations.push(nanos);
        Ok(())
    }

    /// Copy both sample sequences of a device. The two copies are taken under
    /// the same lock, so they always describe one consistent instant.
    pub fn snapshot(&self, device_id: &str) -> Result<DeviceSnapshot> {
        let record = self.record(device_id)?;
        let samples = record.lock();
        Ok(DeviceSnapshot {
            heartbeats: samples.heartbeats.clone(),
            upload_durations: samples.upload_durations.clone(),
        })
    }

    /// Number of registered devices
    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_map().is_empty()
    }

    /// Registered ids, sorted
    pub fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read_map().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn record(&self, device_id: &str) -> Result<Arc<DeviceRecord>> {
        let record = self.read_map().get(device_id).cloned();
        record.ok_or_else(|| {
            debug!(device_id, "Rejected sample for unknown device");
            RegistryError::DeviceNotFound(device_id.to_string())
        })
    }

    fn read_map(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<DeviceRecord>>> {
        self.devices.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Parse a device list: a header row, then one id in the first column of
/// each record. Blank lines and empty ids are skipped. Every record must
/// have as many fields as the header. A stray `"` inside an unquoted field
/// is kept as part of the id.
pub fn read_device_ids<R: Read>(reader: R) -> Result<Vec<String>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let mut ids = Vec::new();
    let mut skipped = 0usize;
    for record in csv_reader.records() {
        let record = record?;
        match record.get(0) {
            Some(id) if !id.is_empty() => ids.push(id.to_string()),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, "Skipped device rows without an id");
    }
    Ok(ids)
}
