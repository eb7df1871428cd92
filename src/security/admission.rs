//! Per-caller admission control.
//!
//! A fixed-window counter per caller key: the first `capacity` operations
//! within a window are admitted and the rest rejected until the record
//! expires. Each admission pushes the expiry out to `window` from now.
//!
//! A caller can get up to `2 × capacity` operations through around a window
//! boundary (the tail of one window plus the head of the next). That is a
//! property of fixed windows and is kept as is.
//!
//! Expired records are replaced lazily on lookup. New keys are inserted one
//! at a time under `insert_lock`, so the store never holds more than
//! `max_keys` records. When it is full, one pass drops every expired record
//! and, if that is not enough, the least recently used live ones, freeing an
//! eighth of the store so the next inserts do not scan again.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::AdmissionConfig;
use crate::observability::metrics;

/// Count of admitted operations within the current window.
#[derive(Debug, Clone, Copy)]
struct AdmissionRecord {
    count: u32,
    expires_at: Instant,
    last_seen: Instant,
}

impl AdmissionRecord {
    fn fresh(now: Instant) -> Self {
        Self {
            count: 0,
            expires_at: now,
            last_seen: now,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Keyed admission gate.
///
/// The check-then-increment for a key runs under that key's shard lock, so
/// concurrent callers with the same key see a linear history.
pub struct AdmissionGate {
    records: DashMap<String, AdmissionRecord>,
    insert_lock: Mutex<()>,
    capacity: u32,
    window: Duration,
    max_keys: usize,
}

impl AdmissionGate {
    /// Zero capacity or key limit is raised to one.
    pub fn new(capacity: u32, window: Duration, max_keys: usize) -> Self {
        Self {
            records: DashMap::new(),
            insert_lock: Mutex::new(()),
            capacity: capacity.max(1),
            window,
            max_keys: max_keys.max(1),
        }
    }

    pub fn from_config(config: &AdmissionConfig) -> Self {
        Self::new(config.capacity, Duration::from_millis(config.window_ms), config.max_keys)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether `key` may start another operation.
    ///
    /// Rejection leaves the record untouched. An empty key is always rejected.
    pub fn try_admit(&self, key: &str) -> bool {
        if key.is_empty() {
            tracing::warn!("Admission requested without a caller key");
            metrics::record_admission(false);
            return false;
        }

        let now = Instant::now();
        let existing = self.records.get_mut(key).map(|mut record| self.admit(&mut record, now));
        let admitted = match existing {
            Some(admitted) => admitted,
            None => self.insert_and_admit(key, now),
        };

        metrics::record_admission(admitted);
        if !admitted {
            tracing::debug!(client = %key, capacity = self.capacity, "Admission rejected");
        }
        admitted
    }

    /// Admissions left for `key` in its current window.
    pub fn remaining(&self, key: &str) -> u32 {
        let now = Instant::now();
        match self.records.get(key) {
            Some(record) if !record.is_expired(now) => self.capacity.saturating_sub(record.count),
            _ => self.capacity,
        }
    }

    /// Time until `key`'s window expires, if it currently has a live record.
    pub fn retry_after(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.records
            .get(key)
            .filter(|record| !record.is_expired(now))
            .map(|record| record.expires_at - now)
    }

    /// Number of keys currently held, live or not yet evicted.
    pub fn tracked_keys(&self) -> usize {
        self.records.len()
    }

    fn admit(&self, record: &mut AdmissionRecord, now: Instant) -> bool {
        if record.is_expired(now) {
            record.count = 0;
        }
        if record.count < self.capacity {
            record.count += 1;
            record.expires_at = now + self.window;
            record.last_seen = now;
            true
        } else {
            false
        }
    }

    fn insert_and_admit(&self, key: &str, now: Instant) -> bool {
        let _guard = self.insert_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.records.contains_key(key) && self.records.len() >= self.max_keys {
            self.make_room(now);
        }

        let mut record = self
            .records
            .entry(key.to_owned())
            .or_insert_with(|| AdmissionRecord::fresh(now));
        self.admit(&mut record, now)
    }

    /// Free at least one slot, and up to an eighth of the store.
    ///
    /// Must be called with `insert_lock` held. A record touched after the
    /// scan is skipped so a concurrent admission is never discarded, unless
    /// nothing else could be freed.
    fn make_room(&self, now: Instant) {
        let mut candidates: Vec<(bool, Instant, u32, String)> = self
            .records
            .iter()
            .map(|entry| (!entry.is_expired(now), entry.last_seen, entry.count, entry.key().clone()))
            .collect();
        candidates.sort_unstable();

        let batch = (self.max_keys / 8).max(1);
        let mut evicted = 0;
        for (live, seen, count, key) in &candidates {
            if *live && evicted >= batch {
                break;
            }
            let untouched = |_: &String, record: &AdmissionRecord| {
                record.last_seen == *seen && record.count == *count
            };
            if self.records.remove_if(key, untouched).is_some() {
                evicted += 1;
            }
        }

        if self.records.len() >= self.max_keys {
            for (_, _, _, key) in &candidates {
                if self.records.remove(key).is_some() {
                    evicted += 1;
                    break;
                }
            }
        }

        metrics::record_admission_eviction(evicted);
        tracing::debug!(evicted, tracked = self.records.len(), "Evicted admission records to make room");
    }
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self::from_config(&AdmissionConfig::default())
    }
}

impl std::fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("capacity", &self.capacity)
            .field("window", &self.window)
            .field("max_keys", &self.max_keys)
            .field("tracked_keys", &self.records.len())
            .finish()
    }
}
