//! Reuse of fetched readings.
//!
//! Readings are bucketed by balancing authority, market and UTC day. A bucket
//! maps each reading's timestamp to its value; `None` marks a timestamp the
//! service reported without a usable value.

use crate::model::Market;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// Readings for one BA, market and day, ordered by timestamp.
pub type CacheBucket = BTreeMap<DateTime<Utc>, Option<f64>>;

/// Storage backing the client's reading cache.
#[cfg_attr(test, mockall::automock)]
pub trait ImpactCache: Send {
    /// Fetch a bucket by key.
    fn get(&self, key: &str) -> Option<CacheBucket>;

    /// Replace a bucket.
    fn set(&mut self, key: &str, bucket: CacheBucket);

    /// Drop every bucket.
    fn clear(&mut self);
}

/// Key of the bucket holding `ts`: `"BA:MARKET:YYYY-MM-DD"`.
pub fn cache_key(ts: DateTime<Utc>, ba: &str, market: &Market) -> String {
    format!(
        "{}:{}:{}",
        ba.to_uppercase(),
        market.as_str().to_uppercase(),
        ts.format("%Y-%m-%d")
    )
}

/// In-process cache. Lives as long as the client that owns it.
#[derive(Debug, Default)]
pub struct MemoryCache {
    buckets: HashMap<String, CacheBucket>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buckets held.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl ImpactCache for MemoryCache {
    fn get(&self, key: &str) -> Option<CacheBucket> {
        self.buckets.get(key).cloned()
    }

    fn set(&mut self, key: &str, bucket: CacheBucket) {
        self.buckets.insert(key.to_string(), bucket);
    }

    fn clear(&mut self) {
        self.buckets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn start_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2014, 9, 2, 23, 0, 0).unwrap()
    }

    fn rt5m() -> Market {
        Market::RealTime5Min
    }

    #[test]
    fn test_key_format() {
        assert_eq!(cache_key(start_at(), "pjm", &rt5m()), "PJM:RT5M:2014-09-02");
    }

    #[test]
    fn test_key_unique_on_ba() {
        assert_ne!(
            cache_key(start_at(), "ba1", &rt5m()),
            cache_key(start_at(), "ba2", &rt5m())
        );
    }

    #[test]
    fn test_key_unique_on_market() {
        assert_ne!(
            cache_key(start_at(), "ba", &Market::from("market1")),
            cache_key(start_at(), "ba", &Market::from("market2"))
        );
    }

    #[test]
    fn test_key_unique_on_year_month_day() {
        let key = cache_key(start_at(), "ba", &rt5m());
        for days in [365, 32, 1] {
            let earlier = start_at() - Duration::days(days);
            assert_ne!(key, cache_key(earlier, "ba", &rt5m()), "{days} days earlier");
        }
    }

    #[test]
    fn test_key_shared_within_day() {
        let on_hour = start_at();
        let off_hour = start_at() + Duration::minutes(10);
        assert_eq!(
            cache_key(on_hour, "PJM", &rt5m()),
            cache_key(off_hour, "PJM", &rt5m())
        );
    }

    #[test]
    fn test_memory_cache_set_get_clear() {
        let mut cache = MemoryCache::new();
        assert!(cache.get("PJM:RT5M:2014-09-02").is_none());

        let mut bucket = CacheBucket::new();
        bucket.insert(start_at(), Some(1800.0));
        cache.set("PJM:RT5M:2014-09-02", bucket.clone());

        assert_eq!(cache.get("PJM:RT5M:2014-09-02"), Some(bucket));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
