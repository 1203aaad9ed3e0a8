//! Negative probe cache
//!
//! Remembers URLs that failed both availability checks so repeated scrapes
//! skip them without touching the network. Entries expire after a TTL and
//! the oldest entry is evicted once the cache is full.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Bounded, expiring set of unreachable URLs
///
/// Safe to share between concurrent probe tasks.
#[derive(Debug)]
pub struct ProbeCache {
    capacity: usize,
    ttl: Duration,
    inner: Mutex<CacheInner>,
}

#[derive(Debug, Default)]
struct CacheInner {
    /// url -> (failed_at, insertion sequence)
    entries: HashMap<String, (DateTime<Utc>, u64)>,
    /// Insertion order; stale pairs are skipped during eviction and
    /// compacted away once they outnumber the live entries
    order: VecDeque<(String, u64)>,
    next_seq: u64,
}

impl ProbeCache {
    /// Creates an empty cache
    ///
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize, ttl: std::time::Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(36_500)),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Checks whether `url` is a known failure
    pub fn contains(&self, url: &str) -> bool {
        self.contains_at(url, Utc::now())
    }

    /// Records `url` as unreachable
    pub fn insert(&self, url: &str) {
        self.insert_at(url, Utc::now());
    }

    /// Number of URLs currently remembered, including expired ones not yet
    /// looked up again
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_at(&self, url: &str, now: DateTime<Utc>) -> bool {
        let mut inner = self.inner.lock();
        let expired = match inner.entries.get(url) {
            Some((failed_at, _)) => now - *failed_at > self.ttl,
            None => return false,
        };

        if expired {
            inner.entries.remove(url);
        }
        !expired
    }

    pub fn insert_at(&self, url: &str, now: DateTime<Utc>) {
        let mut inner = self.inner.lock();

        if let Some(entry) = inner.entries.get_mut(url) {
            entry.0 = now;
            return;
        }

        while inner.entries.len() >= self.capacity {
            let Some((oldest, seq)) = inner.order.pop_front() else {
                break;
            };
            if inner.entries.get(&oldest).map(|(_, s)| *s) == Some(seq) {
                inner.entries.remove(&oldest);
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(url.to_string(), (now, seq));
        inner.order.push_back((url.to_string(), seq));

        // Expired lookups leave their pairs behind
        if inner.order.len() > self.capacity.saturating_mul(2) {
            let CacheInner { entries, order, .. } = &mut *inner;
            order.retain(|(url, seq)| entries.get(url).map(|(_, s)| s) == Some(seq));
        }
    }

    #[cfg(test)]
    fn order_len(&self) -> usize {
        self.inner.lock().order.len()
    }
}
