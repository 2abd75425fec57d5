//! Storage shaping for the external data table: payload truncation to fit
//! the hard quota, plus size estimation telemetry.

use funnel_core::config::StorageConfig;
use funnel_core::error::FunnelResult;
use funnel_core::types::{CriticalIssue, InsightPayload, Opportunity, Recommendation};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Entries kept per list category when optimizing a payload.
const MAX_ENTRIES_PER_CATEGORY: usize = 5;
/// Character budget for issue and opportunity descriptions.
const DESCRIPTION_CHARS: usize = 200;
/// Character budget for recommendation action text.
const ACTION_CHARS: usize = 150;
/// Character budget for recommendation impact text.
const IMPACT_CHARS: usize = 100;

/// Size telemetry for one optimization pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageOptimization {
    pub original_size_kb: f64,
    pub optimized_size_kb: f64,
    pub savings_percent: f64,
}

/// An optimized payload together with its size telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedInsights {
    pub insights: InsightPayload,
    pub storage_optimization: StorageOptimization,
}

/// Storage usage of a payload against the external quota.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageEstimate {
    pub size_bytes: usize,
    pub size_kb: f64,
    pub size_mb: f64,
    pub usage_percent: f64,
    pub remaining_mb: f64,
    pub can_store: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Produce a storage-reduced copy of an insight payload: each list capped
/// at five entries, free text truncated to its character budget, verbose
/// fields dropped. Applying this to an already-optimized payload changes
/// nothing.
pub fn optimize_payload(insights: &InsightPayload) -> InsightPayload {
    InsightPayload {
        critical_issues: insights
            .critical_issues
            .iter()
            .take(MAX_ENTRIES_PER_CATEGORY)
            .map(|issue| CriticalIssue {
                dimension: issue.dimension.clone(),
                value: issue.value.clone(),
                issue: truncate_chars(&issue.issue, DESCRIPTION_CHARS),
                impact: issue.impact.clone(),
                root_cause: None,
            })
            .collect(),
        opportunities: insights
            .opportunities
            .iter()
            .take(MAX_ENTRIES_PER_CATEGORY)
            .map(|opp| Opportunity {
                dimension: opp.dimension.clone(),
                value: opp.value.clone(),
                opportunity: truncate_chars(&opp.opportunity, DESCRIPTION_CHARS),
                potential_lift: opp.potential_lift.clone(),
                why: None,
            })
            .collect(),
        recommendations: insights
            .recommendations
            .iter()
            .take(MAX_ENTRIES_PER_CATEGORY)
            .map(|rec| Recommendation {
                priority: rec.priority,
                action: truncate_chars(&rec.action, ACTION_CHARS),
                expected_impact: truncate_chars(&rec.expected_impact, IMPACT_CHARS),
                implementation: rec.implementation.clone(),
                dimension_focus: None,
            })
            .collect(),
        suggested_tests: Vec::new(),
        model: insights.model.clone(),
    }
}

/// Optimize a payload and report the size reduction.
pub fn optimize_for_storage(insights: &InsightPayload) -> FunnelResult<OptimizedInsights> {
    let optimized = optimize_payload(insights);

    let original_size = serde_json::to_string(insights)?.len();
    let optimized_size = serde_json::to_string(&optimized)?.len();
    let savings_percent = if original_size > 0 {
        (original_size - optimized_size) as f64 / original_size as f64 * 100.0
    } else {
        0.0
    };

    info!(
        original_bytes = original_size,
        optimized_bytes = optimized_size,
        savings_percent = format!("{savings_percent:.1}"),
        "Storage optimization complete"
    );

    Ok(OptimizedInsights {
        insights: optimized,
        storage_optimization: StorageOptimization {
            original_size_kb: round2(original_size as f64 / 1024.0),
            optimized_size_kb: round2(optimized_size as f64 / 1024.0),
            savings_percent: round1(savings_percent),
        },
    })
}

/// Estimate how much of the external storage quota a payload consumes.
pub fn estimate_storage_usage(
    data: &impl Serialize,
    config: &StorageConfig,
) -> FunnelResult<StorageEstimate> {
    let size_bytes = serde_json::to_string(data)?.len();
    let size_mb = size_bytes as f64 / 1024.0 / 1024.0;
    let usage_percent = size_mb / config.quota_mb * 100.0;

    Ok(StorageEstimate {
        size_bytes,
        size_kb: round2(size_bytes as f64 / 1024.0),
        size_mb: round2(size_mb),
        usage_percent: round2(usage_percent),
        remaining_mb: round2(config.quota_mb - size_mb),
        can_store: usage_percent < config.warn_percent,
        warning: (usage_percent > config.warn_percent)
            .then(|| "Storage nearly full!".to_string()),
    })
}

/// Truncate on a character boundary, never mid code point.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
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

    fn verbose_payload() -> InsightPayload {
        InsightPayload {
            critical_issues: (0..8)
                .map(|i| CriticalIssue {
                    dimension: "channel".to_string(),
                    value: format!("value-{i}"),
                    issue: "x".repeat(400),
                    impact: "high".to_string(),
                    root_cause: Some("long-winded explanation".to_string()),
                })
                .collect(),
            opportunities: vec![Opportunity {
                dimension: "device".to_string(),
                value: "desktop".to_string(),
                opportunity: "y".repeat(300),
                potential_lift: "+20%".to_string(),
                why: Some("because".to_string()),
            }],
            recommendations: vec![Recommendation {
                priority: 1,
                action: "z".repeat(200),
                expected_impact: "w".repeat(150),
                implementation: "Quick".to_string(),
                dimension_focus: Some("channel".to_string()),
            }],
            suggested_tests: vec![funnel_core::types::SuggestedTest {
                test_name: "social creative test".to_string(),
                ..Default::default()
            }],
            model: Some("insight-gen-1".to_string()),
        }
    }

    #[test]
    fn test_optimize_caps_lists_and_truncates_text() {
        let optimized = optimize_payload(&verbose_payload());

        assert_eq!(optimized.critical_issues.len(), 5);
        assert_eq!(optimized.critical_issues[0].issue.chars().count(), 200);
        assert!(optimized.critical_issues[0].root_cause.is_none());
        assert_eq!(optimized.opportunities[0].opportunity.chars().count(), 200);
        assert!(optimized.opportunities[0].why.is_none());
        assert_eq!(optimized.recommendations[0].action.chars().count(), 150);
        assert_eq!(
            optimized.recommendations[0].expected_impact.chars().count(),
            100
        );
        assert!(optimized.recommendations[0].dimension_focus.is_none());
        assert!(optimized.suggested_tests.is_empty());
        assert_eq!(optimized.model.as_deref(), Some("insight-gen-1"));
    }

    #[test]
    fn test_optimize_is_idempotent() {
        let once = optimize_payload(&verbose_payload());
        let twice = optimize_payload(&once);

        let first = serde_json::to_string(&once).unwrap();
        let second = serde_json::to_string(&twice).unwrap();
        assert_eq!(first, second, "second pass must be byte-identical");
    }

    #[test]
    fn test_truncation_respects_multibyte_chars() {
        let text = "é".repeat(300);
        let truncated = truncate_chars(&text, 200);
        assert_eq!(truncated.chars().count(), 200);
    }

    #[test]
    fn test_optimize_reports_savings() {
        let result = optimize_for_storage(&verbose_payload()).unwrap();

        assert!(result.storage_optimization.savings_percent > 0.0);
        assert!(
            result.storage_optimization.optimized_size_kb
                < result.storage_optimization.original_size_kb
        );
    }

    #[test]
    fn test_empty_payload_has_zero_savings() {
        let result = optimize_for_storage(&InsightPayload::default()).unwrap();
        assert_eq!(result.storage_optimization.savings_percent, 0.0);
    }

    #[test]
    fn test_estimate_storage_usage_within_quota() {
        let estimate =
            estimate_storage_usage(&verbose_payload(), &StorageConfig::default()).unwrap();

        assert!(estimate.size_bytes > 0);
        assert!(estimate.can_store);
        assert!(estimate.warning.is_none());
        assert!(estimate.remaining_mb > 53.0);
        assert!(estimate.usage_percent < 1.0);
    }

    #[test]
    fn test_estimate_warns_near_quota() {
        // Shrink the quota instead of building a 50 MB payload.
        let config = StorageConfig {
            quota_mb: 0.001,
            ..StorageConfig::default()
        };
        let estimate = estimate_storage_usage(&verbose_payload(), &config).unwrap();

        assert!(!estimate.can_store);
        assert_eq!(estimate.warning.as_deref(), Some("Storage nearly full!"));
    }
}
