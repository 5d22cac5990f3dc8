//! Read-through cache in front of a `SeriesSource`.
//!
//! Keyed by the structured `SeriesQuery` (code + month range). Published index
//! values do not change, so the only invalidation is the TTL. Errors and empty
//! answers are never cached: an empty range usually means "not published yet".

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::data::source::{SeriesQuery, SeriesSource};
use crate::domain::RawObservation;
use crate::error::ReadjustError;

#[derive(Debug, Clone)]
struct Entry {
    stored_at: Instant,
    rows: Vec<RawObservation>,
}

pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    entries: Mutex<HashMap<SeriesQuery, Entry>>,
}

impl<S: SeriesSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of live (non-expired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .map(|m| m.values().filter(|e| now.duration_since(e.stored_at) < self.ttl).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, query: &SeriesQuery) -> Option<Vec<RawObservation>> {
        let mut entries = self.entries.lock().ok()?;
        let fresh = entries
            .get(query)
            .is_some_and(|e| e.stored_at.elapsed() < self.ttl);
        if fresh {
            entries.get(query).map(|e| e.rows.clone())
        } else {
            entries.remove(query);
            None
        }
    }
}

impl<S: SeriesSource> SeriesSource for CachedSource<S> {
    fn fetch(&self, query: &SeriesQuery) -> Result<Vec<RawObservation>, ReadjustError> {
        if let Some(rows) = self.lookup(query) {
            debug!(series = %query.code, start = %query.start_month, end = %query.end_month, "cache hit");
            return Ok(rows);
        }
        debug!(series = %query.code, start = %query.start_month, end = %query.end_month, "cache miss");

        let rows = self.inner.fetch(query)?;
        if !rows.is_empty() {
            if let Ok(mut entries) = self.entries.lock() {
                entries.insert(
                    *query,
                    Entry {
                        stored_at: Instant::now(),
                        rows: rows.clone(),
                    },
                );
            }
        }
        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("{} (cached, ttl {}s)", self.inner.describe(), self.ttl.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use chrono::NaiveDate;

    use crate::domain::SeriesCode;

    struct CountingSource {
        calls: Cell<usize>,
        rows: Vec<RawObservation>,
    }

    impl SeriesSource for CountingSource {
        fn fetch(&self, _query: &SeriesQuery) -> Result<Vec<RawObservation>, ReadjustError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.rows.clone())
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    fn query(code: u32) -> SeriesQuery {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        SeriesQuery::new(SeriesCode(code), d, d).unwrap()
    }

    fn counting(rows: Vec<RawObservation>) -> CountingSource {
        CountingSource {
            calls: Cell::new(0),
            rows,
        }
    }

    #[test]
    fn hit_and_miss_return_identical_rows() {
        let cache = CachedSource::new(
            counting(vec![RawObservation::text("01/01/2024", "0.42")]),
            Duration::from_secs(60),
        );
        let miss = cache.fetch(&query(433)).unwrap();
        let hit = cache.fetch(&query(433)).unwrap();
        assert_eq!(miss, hit);
        assert_eq!(cache.inner().calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn different_keys_do_not_collide() {
        let cache = CachedSource::new(
            counting(vec![RawObservation::text("01/01/2024", "0.42")]),
            Duration::from_secs(60),
        );
        cache.fetch(&query(433)).unwrap();
        cache.fetch(&query(189)).unwrap();
        assert_eq!(cache.inner().calls.get(), 2);
    }

    #[test]
    fn zero_ttl_never_hits() {
        let cache = CachedSource::new(
            counting(vec![RawObservation::text("01/01/2024", "0.42")]),
            Duration::ZERO,
        );
        cache.fetch(&query(433)).unwrap();
        cache.fetch(&query(433)).unwrap();
        assert_eq!(cache.inner().calls.get(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn empty_answers_are_not_cached() {
        let cache = CachedSource::new(counting(Vec::new()), Duration::from_secs(60));
        cache.fetch(&query(433)).unwrap();
        cache.fetch(&query(433)).unwrap();
        assert_eq!(cache.inner().calls.get(), 2);
    }
}
