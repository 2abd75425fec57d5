//! Insight cache — fingerprints analysis requests and stores generated
//! insight payloads so the expensive external call is not repeated.
//! Capacity-bounded: reaching the entry limit evicts the oldest 25%.

use chrono::{DateTime, Duration, Utc};
use funnel_core::config::CacheConfig;
use funnel_core::error::FunnelResult;
use funnel_core::types::{AnalysisRequest, BaselineRates, InsightPayload};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{debug, info};

/// A cached insight payload with its creation timestamp.
///
/// `created_at` is kept in RFC 3339 text form, the shape it takes in the
/// external data table. An unparseable timestamp degrades to a cache miss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub created_at: String,
    pub insights: InsightPayload,
}

/// Cache statistics for telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub max_cache_size: usize,
    pub cache_size_bytes: usize,
    pub cache_size_mb: f64,
    pub oldest_entry: Option<String>,
    pub newest_entry: Option<String>,
    pub memory_usage_percent: f64,
}

/// Canonical material the fingerprint is computed over. Field order is
/// fixed by declaration and the dimension list is sorted, so two logically
/// identical requests serialize identically.
#[derive(Serialize)]
struct FingerprintMaterial<'a> {
    baseline_rates: Option<&'a BaselineRates>,
    date_range: &'a str,
    dimensions: Vec<&'a str>,
    property_id: &'a str,
}

/// In-memory insight cache guarded by a single mutex. The
/// check-evict-insert sequence on `set` and the lookup-expire sequence on
/// `get` each run as one critical section, so concurrent request handlers
/// can share one instance behind an `Arc`.
pub struct InsightCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl InsightCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::hours(config.ttl_hours as i64),
            max_entries: config.max_entries,
        }
    }

    /// Fingerprint of the normalized request shape: SHA-256 over the
    /// canonical serialization, hex encoded. Dimension order in the
    /// caller's input does not affect the result.
    pub fn fingerprint(request: &AnalysisRequest) -> FunnelResult<String> {
        let mut dimensions: Vec<&str> = request.dimensions.iter().map(String::as_str).collect();
        dimensions.sort_unstable();

        let material = FingerprintMaterial {
            baseline_rates: request.baseline_rates.as_ref(),
            date_range: &request.date_range,
            dimensions,
            property_id: &request.property_id,
        };

        let canonical = serde_json::to_string(&material)?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    /// Retrieve cached insights if present and not expired.
    ///
    /// Expiry is checked lazily here; there is no background sweep. A
    /// stored timestamp that fails to parse is treated exactly like an
    /// expired entry: removed and reported as a miss.
    pub fn get(&self, fingerprint: &str) -> Option<InsightPayload> {
        let mut entries = self.entries.lock();

        let created_at = match entries.get(fingerprint) {
            Some(entry) => parse_created_at(&entry.created_at),
            None => {
                metrics::counter!("cache.insights.miss").increment(1);
                debug!(key = key_prefix(fingerprint), "Cache miss");
                return None;
            }
        };

        let created_at = match created_at {
            Some(ts) => ts,
            None => {
                entries.remove(fingerprint);
                metrics::counter!("cache.insights.corrupt").increment(1);
                debug!(key = key_prefix(fingerprint), "Corrupt cache timestamp, treating as miss");
                return None;
            }
        };

        let age = Utc::now() - created_at;
        if age > self.ttl {
            entries.remove(fingerprint);
            metrics::counter!("cache.insights.expired").increment(1);
            debug!(key = key_prefix(fingerprint), "Cache expired");
            return None;
        }

        metrics::counter!("cache.insights.hit").increment(1);
        debug!(
            key = key_prefix(fingerprint),
            age_secs = age.num_seconds(),
            "Cache hit"
        );
        entries.get(fingerprint).map(|entry| entry.insights.clone())
    }

    /// Store insights under the given fingerprint. When the cache is at
    /// capacity the oldest 25% of entries (at least one) are evicted first,
    /// inside the same critical section as the insert.
    pub fn set(&self, fingerprint: String, insights: InsightPayload) {
        let mut entries = self.entries.lock();

        if entries.len() >= self.max_entries {
            self.evict_oldest(&mut entries);
        }

        info!(
            key = key_prefix(&fingerprint),
            size = entries.len() + 1,
            max = self.max_entries,
            "Cached insights"
        );
        entries.insert(
            fingerprint,
            CacheEntry {
                created_at: Utc::now().to_rfc3339(),
                insights,
            },
        );
    }

    /// Remove the oldest `max_entries / 4` entries (at least one), ordered
    /// by stored timestamp. Unparseable timestamps sort oldest and go first.
    fn evict_oldest(&self, entries: &mut HashMap<String, CacheEntry>) {
        let entries_to_remove = std::cmp::max(1, self.max_entries / 4);

        let mut by_age: Vec<(String, DateTime<Utc>)> = entries
            .iter()
            .map(|(key, entry)| {
                (
                    key.clone(),
                    parse_created_at(&entry.created_at).unwrap_or(DateTime::<Utc>::MIN_UTC),
                )
            })
            .collect();
        by_age.sort_by_key(|(_, created_at)| *created_at);

        for (key, _) in by_age.into_iter().take(entries_to_remove) {
            entries.remove(&key);
            debug!(key = key_prefix(&key), "Evicted oldest cache entry");
        }

        metrics::counter!("cache.insights.evicted").increment(entries_to_remove as u64);
        info!(removed = entries_to_remove, "Cache eviction complete");
    }

    /// Current cache statistics, including the approximate serialized size
    /// of all entries.
    pub fn stats(&self) -> FunnelResult<CacheStats> {
        let entries = self.entries.lock();

        let cache_size_bytes = serde_json::to_string(&*entries)?.len();

        let mut timestamps: Vec<DateTime<Utc>> = entries
            .values()
            .filter_map(|entry| parse_created_at(&entry.created_at))
            .collect();
        timestamps.sort_unstable();

        Ok(CacheStats {
            total_entries: entries.len(),
            max_cache_size: self.max_entries,
            cache_size_bytes,
            cache_size_mb: round2(cache_size_bytes as f64 / 1024.0 / 1024.0),
            oldest_entry: timestamps.first().map(|ts| ts.to_rfc3339()),
            newest_entry: timestamps.last().map(|ts| ts.to_rfc3339()),
            memory_usage_percent: round1(
                entries.len() as f64 / self.max_entries as f64 * 100.0,
            ),
        })
    }

    /// Drop every entry. Intended for tests and debugging.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        let removed = entries.len();
        entries.clear();
        info!(removed, "Cleared insight cache");
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn key_prefix(key: &str) -> &str {
    key.get(..8).unwrap_or(key)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use funnel_core::types::Recommendation;

    fn cache_with(max_entries: usize) -> InsightCache {
        InsightCache::new(&CacheConfig {
            ttl_hours: 24,
            max_entries,
        })
    }

    fn payload(tag: &str) -> InsightPayload {
        InsightPayload {
            recommendations: vec![Recommendation {
                priority: 1,
                action: format!("act on {tag}"),
                ..Recommendation::default()
            }],
            ..InsightPayload::default()
        }
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = cache_with(10);
        assert!(cache.get("absent").is_none());

        cache.set("key-1".to_string(), payload("one"));
        let hit = cache.get("key-1").expect("expected a hit");
        assert_eq!(hit.recommendations[0].action, "act on one");
    }

    #[test]
    fn test_expired_entry_is_removed_and_missed() {
        let cache = cache_with(10);
        cache.entries.lock().insert(
            "stale".to_string(),
            CacheEntry {
                created_at: (Utc::now() - Duration::hours(25)).to_rfc3339(),
                insights: payload("stale"),
            },
        );

        assert!(cache.get("stale").is_none());
        assert!(cache.is_empty(), "expired entry must be evicted on read");
    }

    #[test]
    fn test_corrupt_timestamp_degrades_to_miss() {
        let cache = cache_with(10);
        cache.entries.lock().insert(
            "broken".to_string(),
            CacheEntry {
                created_at: "not-a-timestamp".to_string(),
                insights: payload("broken"),
            },
        );

        assert!(cache.get("broken").is_none());
        assert!(cache.is_empty(), "corrupt entry must be removed");
    }

    #[test]
    fn test_fingerprint_ignores_dimension_order() {
        let a = AnalysisRequest {
            dimensions: vec!["channel".to_string(), "device".to_string()],
            property_id: "123".to_string(),
            date_range: "last_30_days".to_string(),
            baseline_rates: None,
        };
        let b = AnalysisRequest {
            dimensions: vec!["device".to_string(), "channel".to_string()],
            ..a.clone()
        };

        let fp_a = InsightCache::fingerprint(&a).unwrap();
        let fp_b = InsightCache::fingerprint(&b).unwrap();
        assert_eq!(fp_a, fp_b);
        assert_eq!(fp_a.len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_request_shape() {
        let base = AnalysisRequest {
            dimensions: vec!["channel".to_string()],
            property_id: "123".to_string(),
            date_range: "last_30_days".to_string(),
            baseline_rates: None,
        };
        let other = AnalysisRequest {
            date_range: "last_7_days".to_string(),
            ..base.clone()
        };

        assert_ne!(
            InsightCache::fingerprint(&base).unwrap(),
            InsightCache::fingerprint(&other).unwrap()
        );
    }

    #[test]
    fn test_eviction_removes_oldest_quarter_before_insert() {
        let cache = cache_with(8);

        for i in 0..8 {
            cache.set(format!("key-{i}"), payload(&i.to_string()));
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        assert_eq!(cache.len(), 8);

        // 9th insert: the oldest 8/4 = 2 entries go first.
        cache.set("key-8".to_string(), payload("8"));

        assert_eq!(cache.len(), 7);
        assert!(cache.get("key-0").is_none());
        assert!(cache.get("key-1").is_none());
        assert!(cache.get("key-2").is_some());
        assert!(cache.get("key-8").is_some());
    }

    #[test]
    fn test_eviction_keeps_count_at_or_below_capacity() {
        let cache = cache_with(4);
        for i in 0..20 {
            cache.set(format!("key-{i}"), payload(&i.to_string()));
            assert!(cache.len() <= 4, "cache exceeded capacity at insert {i}");
        }
    }

    #[test]
    fn test_stats() {
        let cache = cache_with(10);
        cache.set("key-a".to_string(), payload("a"));
        cache.set("key-b".to_string(), payload("b"));

        let stats = cache.stats().unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.max_cache_size, 10);
        assert!(stats.cache_size_bytes > 0);
        assert_eq!(stats.memory_usage_percent, 20.0);
        assert!(stats.oldest_entry.is_some());
        assert!(stats.newest_entry.is_some());

        cache.clear();
        assert!(cache.is_empty());
        let stats = cache.stats().unwrap();
        assert!(stats.oldest_entry.is_none());
    }
}
