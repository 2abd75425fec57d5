//! Cache and storage flow: fingerprint, miss/hit, capacity eviction, and
//! the optimize-then-store path.

use funnel_cache::{estimate_storage_usage, optimize_for_storage, InsightCache};
use funnel_core::config::{CacheConfig, StorageConfig};
use funnel_core::types::{
    AnalysisRequest, BaselineRates, CriticalIssue, InsightPayload, Recommendation,
};

fn request() -> AnalysisRequest {
    AnalysisRequest {
        dimensions: vec![
            "sessionDefaultChannelGroup".to_string(),
            "deviceCategory".to_string(),
        ],
        property_id: "123456789".to_string(),
        date_range: "last_30_days".to_string(),
        baseline_rates: Some(BaselineRates {
            view_item_to_add_to_cart: 0.152,
            add_to_cart_to_purchase: 0.087,
            overall_conversion: 0.0132,
            total_events: None,
        }),
    }
}

fn generated_insights() -> InsightPayload {
    InsightPayload {
        critical_issues: vec![CriticalIssue {
            dimension: "channel".to_string(),
            value: "Social".to_string(),
            issue: "Social traffic adds to cart at roughly half the baseline rate".to_string(),
            impact: "high".to_string(),
            root_cause: Some("creative mismatch with landing pages".to_string()),
        }],
        recommendations: vec![Recommendation {
            priority: 1,
            action: "Align Social ad creative with the product landing pages".to_string(),
            expected_impact: "view-to-cart recovery toward baseline".to_string(),
            implementation: "Quick".to_string(),
            dimension_focus: Some("channel".to_string()),
        }],
        ..InsightPayload::default()
    }
}

#[test]
fn test_miss_generate_store_hit_cycle() {
    let cache = InsightCache::new(&CacheConfig::default());
    let fingerprint = InsightCache::fingerprint(&request()).unwrap();

    // First lookup misses: the caller is now obliged to invoke the
    // external generator and store the result.
    assert!(cache.get(&fingerprint).is_none());

    cache.set(fingerprint.clone(), generated_insights());

    let cached = cache.get(&fingerprint).expect("second lookup must hit");
    assert_eq!(cached.critical_issues[0].value, "Social");

    // An equivalent request with reordered dimensions maps to the same
    // entry.
    let mut reordered = request();
    reordered.dimensions.reverse();
    let fingerprint2 = InsightCache::fingerprint(&reordered).unwrap();
    assert!(cache.get(&fingerprint2).is_some());
}

#[test]
fn test_capacity_eviction_at_default_size() {
    let cache = InsightCache::new(&CacheConfig::default());

    for i in 0..100 {
        cache.set(format!("fp-{i:03}"), InsightPayload::default());
    }
    assert_eq!(cache.len(), 100);

    // The 101st insert evicts the oldest 100 / 4 = 25 entries first.
    cache.set("fp-100".to_string(), InsightPayload::default());
    assert_eq!(cache.len(), 76);
    assert!(cache.get("fp-100").is_some());
}

#[test]
fn test_optimized_payload_fits_quota() {
    let optimized = optimize_for_storage(&generated_insights()).unwrap();

    let estimate =
        estimate_storage_usage(&optimized.insights, &StorageConfig::default()).unwrap();
    assert!(estimate.can_store);
    assert!(estimate.warning.is_none());

    // Telemetry is internally consistent.
    let telemetry = &optimized.storage_optimization;
    assert!(telemetry.optimized_size_kb <= telemetry.original_size_kb);
    assert!(telemetry.savings_percent >= 0.0);
}
