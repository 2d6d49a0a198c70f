// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use chrono_tz::Tz;

use crate::store::{FeedId, localize};

/// Number of feed documents kept by default
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// A rendered feed document and the instant it was rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub generated_at: DateTime<Utc>,
    pub content: Arc<str>,
}

/// Storage for rendered feed documents, keyed by feed id.
///
/// Entries are only ever replaced whole.
pub trait FeedCache: Send + Sync {
    fn get(&self, feed_id: FeedId) -> Option<CacheEntry>;

    fn put(&self, feed_id: FeedId, entry: CacheEntry);

    fn invalidate(&self, feed_id: FeedId);
}

/// In-process cache bounded to a fixed number of feeds
#[derive(Debug)]
pub struct MemoryCache {
    entries: RwLock<HashMap<FeedId, CacheEntry>>,
    capacity: usize,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// A cache holding at most `capacity` feeds (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedCache for MemoryCache {
    fn get(&self, feed_id: FeedId) -> Option<CacheEntry> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&feed_id)
            .cloned()
    }

    fn put(&self, feed_id: FeedId, entry: CacheEntry) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(feed_id, entry);

        // Evict the oldest renders, never the one just stored.
        while entries.len() > self.capacity {
            let oldest = entries
                .iter()
                .filter(|(id, _)| **id != feed_id)
                .min_by_key(|(_, entry)| entry.generated_at)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    entries.remove(&id);
                    tracing::debug!(feed_id = id, "Evicted cached feed");
                }
                None => break,
            }
        }
    }

    fn invalidate(&self, feed_id: FeedId) {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&feed_id);
        if removed.is_some() {
            tracing::debug!(feed_id, "Invalidated cached feed");
        }
    }
}

/// Fixed daily wall-clock times at which cached feeds become stale
#[derive(Debug, Clone)]
pub struct RefreshSchedule {
    tz: Tz,
    times: Vec<NaiveTime>,
}

impl RefreshSchedule {
    pub fn daily(tz: Tz, times: impl IntoIterator<Item = NaiveTime>) -> Self {
        let mut times: Vec<NaiveTime> = times.into_iter().collect();
        times.sort();
        times.dedup();
        Self { tz, times }
    }

    /// The most recent scheduled refresh instant not after `now`
    pub fn latest_at_or_before(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = now.with_timezone(&self.tz).date_naive();

        [today, today - TimeDelta::days(1)]
            .into_iter()
            .flat_map(|date| {
                self.times
                    .iter()
                    .map(move |time| localize(self.tz, date.and_time(*time)).with_timezone(&Utc))
            })
            .filter(|instant| *instant <= now)
            .max()
    }

    /// Whether a refresh instant falls within `(generated_at, now]`
    pub fn is_stale(&self, generated_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.latest_at_or_before(now)
            .is_some_and(|refresh| refresh > generated_at)
    }
}
