//! Time-bounded fetch cache
//!
//! Wraps any [`WellnessSource`] and remembers successful fetches keyed by
//! athlete and date range. Entries older than the TTL are fetched again and
//! dropped whenever a new fetch is stored; errors are never cached.

use crate::error::Result;
use crate::models::{ActivitySample, DateRange, PlannedWorkout, WellnessSample};
use crate::source::WellnessSource;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

type Key = (String, NaiveDate, NaiveDate);

struct Entry<T> {
    fetched_at: Instant,
    rows: Vec<T>,
}

struct Slot<T> {
    entries: Mutex<HashMap<Key, Entry<T>>>,
}

impl<T: Clone> Slot<T> {
    fn new() -> Self {
        Slot {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get_or_fetch<F>(&self, kind: &str, key: Key, ttl: Duration, fetch: F) -> Result<Vec<T>>
    where
        F: FnOnce() -> Result<Vec<T>>,
    {
        {
            let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = entries.get(&key) {
                if entry.fetched_at.elapsed() < ttl {
                    debug!(kind, athlete = %key.0, from = %key.1, to = %key.2, "Cache hit");
                    return Ok(entry.rows.clone());
                }
            }
        }

        debug!(kind, athlete = %key.0, from = %key.1, to = %key.2, "Cache miss");
        let rows = fetch()?;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
        if entries.len() < before {
            debug!(kind, evicted = before - entries.len(), "Expired cache entries dropped");
        }
        entries.insert(
            key,
            Entry {
                fetched_at: Instant::now(),
                rows: rows.clone(),
            },
        );
        Ok(rows)
    }

    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Caching decorator over a wellness source
pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    wellness: Slot<WellnessSample>,
    activities: Slot<ActivitySample>,
    events: Slot<PlannedWorkout>,
}

impl<S: WellnessSource> CachedSource<S> {
    /// Default time-to-live, one hour
    pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

    pub fn new(inner: S, ttl: Duration) -> Self {
        CachedSource {
            inner,
            ttl,
            wellness: Slot::new(),
            activities: Slot::new(),
            events: Slot::new(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of cached fetches across all collections
    pub fn len(&self) -> usize {
        self.wellness.len() + self.activities.len() + self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.wellness.clear();
        self.activities.clear();
        self.events.clear();
    }

    fn key(athlete_id: &str, range: DateRange) -> Key {
        (athlete_id.to_string(), range.start, range.end)
    }
}

impl<S: WellnessSource> WellnessSource for CachedSource<S> {
    fn fetch_wellness(&self, athlete_id: &str, range: DateRange) -> Result<Vec<WellnessSample>> {
        self.wellness
            .get_or_fetch("wellness", Self::key(athlete_id, range), self.ttl, || {
                self.inner.fetch_wellness(athlete_id, range)
            })
    }

    fn fetch_activities(&self, athlete_id: &str, range: DateRange) -> Result<Vec<ActivitySample>> {
        self.activities
            .get_or_fetch("activities", Self::key(athlete_id, range), self.ttl, || {
                self.inner.fetch_activities(athlete_id, range)
            })
    }

    fn fetch_events(&self, athlete_id: &str, range: DateRange) -> Result<Vec<PlannedWorkout>> {
        self.events
            .get_or_fetch("events", Self::key(athlete_id, range), self.ttl, || {
                self.inner.fetch_events(athlete_id, range)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConnectivityError, ReadyRsError};
    use std::cell::Cell;

    struct CountingSource {
        calls: Cell<usize>,
        fail: bool,
    }

    impl CountingSource {
        fn new(fail: bool) -> Self {
            CountingSource {
                calls: Cell::new(0),
                fail,
            }
        }
    }

    impl WellnessSource for CountingSource {
        fn fetch_wellness(&self, _athlete_id: &str, range: DateRange) -> Result<Vec<WellnessSample>> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(ReadyRsError::Connectivity(ConnectivityError::Unreachable {
                    url: "test".to_string(),
                    reason: "down".to_string(),
                }));
            }
            Ok(vec![WellnessSample::new(range.end)])
        }

        fn fetch_activities(&self, _athlete_id: &str, _range: DateRange) -> Result<Vec<ActivitySample>> {
            self.calls.set(self.calls.get() + 1);
            Ok(Vec::new())
        }

        fn fetch_events(&self, _athlete_id: &str, range: DateRange) -> Result<Vec<PlannedWorkout>> {
            self.calls.set(self.calls.get() + 1);
            Ok(vec![PlannedWorkout::new(range.start)])
        }
    }

    fn range(days: u32) -> DateRange {
        DateRange::ending_on(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(), days)
    }

    #[test]
    fn test_repeated_fetch_hits_cache() {
        let cached = CachedSource::new(CountingSource::new(false), CachedSource::<CountingSource>::DEFAULT_TTL);
        cached.fetch_wellness("i1", range(7)).unwrap();
        let rows = cached.fetch_wellness("i1", range(7)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(cached.inner().calls.get(), 1);
    }

    #[test]
    fn test_key_includes_athlete_range_and_kind() {
        let cached = CachedSource::new(CountingSource::new(false), Duration::from_secs(60));
        cached.fetch_wellness("i1", range(7)).unwrap();
        cached.fetch_wellness("i2", range(7)).unwrap();
        cached.fetch_wellness("i1", range(28)).unwrap();
        cached.fetch_activities("i1", range(7)).unwrap();
        cached.fetch_events("i1", range(7)).unwrap();
        assert_eq!(cached.inner().calls.get(), 5);
        assert_eq!(cached.len(), 5);

        cached.clear();
        assert!(cached.is_empty());
    }

    #[test]
    fn test_expired_entries_are_refetched() {
        let cached = CachedSource::new(CountingSource::new(false), Duration::ZERO);
        cached.fetch_wellness("i1", range(7)).unwrap();
        cached.fetch_wellness("i1", range(7)).unwrap();
        assert_eq!(cached.inner().calls.get(), 2);
    }

    #[test]
    fn test_expired_entries_are_dropped_on_store() {
        let cached = CachedSource::new(CountingSource::new(false), Duration::ZERO);
        for days in [7, 14, 28, 56, 84] {
            cached.fetch_wellness("i1", range(days)).unwrap();
        }
        // Only the latest fetch survives each insert
        assert_eq!(cached.len(), 1);

        let cached = CachedSource::new(CountingSource::new(false), Duration::from_secs(600));
        for days in [7, 14, 28] {
            cached.fetch_wellness("i1", range(days)).unwrap();
        }
        assert_eq!(cached.len(), 3);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cached = CachedSource::new(CountingSource::new(true), Duration::from_secs(60));
        assert!(cached.fetch_wellness("i1", range(7)).is_err());
        assert!(cached.fetch_wellness("i1", range(7)).is_err());
        assert_eq!(cached.inner().calls.get(), 2);
        assert!(cached.is_empty());
    }
}
