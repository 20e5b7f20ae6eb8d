//! Time-window deduplication of noisy hardware notifications.
//!
//! Each key remembers when it last let a notification through. A new
//! notification for the same key is suppressed while it is less than one
//! window newer than the remembered one. The check and the update happen
//! under the key's shard lock, so two callback threads racing on the same
//! key can never both get through.

use std::time::Duration;

use chrono::TimeDelta;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use dtsgate_domain::time::Timestamp;

/// Last admitted notification for one key.
#[derive(Debug, Clone, PartialEq)]
pub struct Seen<P> {
    pub at: Timestamp,
    pub payload: P,
}

/// Concurrent per-key suppression window.
///
/// Times are the notifications' own timestamps, not the local clock, so
/// replayed or delayed hardware batches are judged by when they were
/// measured.
#[derive(Debug)]
pub struct DedupWindow<P = ()> {
    window: TimeDelta,
    entries: DashMap<String, Seen<P>>,
}

impl<P> DedupWindow<P> {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window: TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX),
            entries: DashMap::new(),
        }
    }

    /// Admit or suppress a notification for `key` measured at `at`.
    ///
    /// Returns `true` when the notification may proceed, in which case it
    /// becomes the new reference for the key.
    pub fn admit(&self, key: impl Into<String>, at: Timestamp, payload: P) -> bool {
        match self.entries.entry(key.into()) {
            Entry::Occupied(mut entry) => {
                if at - entry.get().at < self.window {
                    return false;
                }
                entry.insert(Seen { at, payload });
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(Seen { at, payload });
                true
            }
        }
    }

    /// Last admitted notification for `key`.
    pub fn last(&self, key: &str) -> Option<Seen<P>>
    where
        P: Clone,
    {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every key.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
