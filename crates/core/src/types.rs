//! Shared domain types for funnel analysis: raw step counts, derived
//! metrics, baselines, outliers, and the insight payload exchanged with the
//! external insight generator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ─── Raw funnel data ────────────────────────────────────────────────────────

/// Event counts for the three ecommerce funnel steps of one dimension value.
///
/// Absent steps deserialize to 0. No ordering is enforced between steps:
/// malformed exports may report more purchases than views, and all derived
/// math tolerates that rather than rejecting the row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCounts {
    #[serde(default)]
    pub view_item: u64,
    #[serde(default)]
    pub add_to_cart: u64,
    #[serde(default)]
    pub purchase: u64,
}

/// A full funnel export: per-dimension, per-value step counts plus the
/// request metadata it was pulled for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunnelData {
    #[serde(default)]
    pub property_id: String,
    #[serde(default)]
    pub date_range: String,
    #[serde(default)]
    pub funnel_steps: Vec<String>,
    /// dimension name -> dimension value -> step counts.
    #[serde(default)]
    pub dimension_breakdowns: BTreeMap<String, BTreeMap<String, StepCounts>>,
}

// ─── Derived metrics ────────────────────────────────────────────────────────

/// Conversion metrics for one (dimension, value) pair. Recomputed from raw
/// counts on every call, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionMetric {
    /// add_to_cart / view_item, rounded to 4 decimals. 0 when view_item is 0.
    pub view_to_cart_rate: f64,
    /// purchase / add_to_cart, rounded to 4 decimals. 0 when add_to_cart is 0.
    pub cart_to_purchase_rate: f64,
    /// purchase / view_item, rounded to 4 decimals. 0 when view_item is 0.
    pub overall_conversion_rate: f64,
    pub absolute_numbers: StepCounts,
    /// view_item - add_to_cart; negative on malformed input.
    pub view_to_cart_dropoff: i64,
    /// add_to_cart - purchase; negative on malformed input.
    pub cart_to_purchase_dropoff: i64,
}

/// Per-dimension metric table: dimension name -> value -> metrics.
pub type FunnelMetrics = BTreeMap<String, BTreeMap<String, DimensionMetric>>;

/// Reference conversion rates that dimension values are compared against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineRates {
    pub view_item_to_add_to_cart: f64,
    pub add_to_cart_to_purchase: f64,
    pub overall_conversion: f64,
    /// Aggregate counts the baseline was derived from. Absent when the
    /// caller supplied the baseline explicitly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_events: Option<StepCounts>,
}

// ─── Outliers ───────────────────────────────────────────────────────────────

/// Whether a dimension value performs above or below baseline, by the sign
/// of its overall deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Performance {
    Above,
    Below,
}

/// Coarse severity bucket derived from deviation magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Sort rank: critical issues first.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }
}

/// A dimension value whose performance deviates from baseline beyond the
/// configured threshold. Transient: rebuilt on every analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outlier {
    pub dimension: String,
    pub dimension_value: String,
    pub view_to_cart_rate: f64,
    pub cart_to_purchase_rate: f64,
    pub overall_conversion_rate: f64,
    pub view_to_cart_deviation: f64,
    pub cart_to_purchase_deviation: f64,
    pub overall_deviation: f64,
    pub absolute_numbers: StepCounts,
    pub performance: Performance,
    pub severity: Severity,
}

/// Outliers grouped by dimension, each list sorted by descending
/// |overall_deviation|.
pub type OutlierMap = BTreeMap<String, Vec<Outlier>>;

// ─── Analysis request shape ─────────────────────────────────────────────────

/// The request shape that identifies one analysis for caching purposes.
/// Two logically identical requests must fingerprint identically regardless
/// of how the caller ordered the dimension list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub dimensions: Vec<String>,
    pub property_id: String,
    pub date_range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_rates: Option<BaselineRates>,
}

// ─── Insight payload ────────────────────────────────────────────────────────

/// An underperforming segment called out by the insight generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticalIssue {
    #[serde(default)]
    pub dimension: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<String>,
}

/// An overperforming segment worth capitalizing on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    #[serde(default)]
    pub dimension: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub opportunity: String,
    #[serde(default)]
    pub potential_lift: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why: Option<String>,
}

/// A prioritized action item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default)]
    pub priority: u32,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub expected_impact: String,
    #[serde(default)]
    pub implementation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_focus: Option<String>,
}

/// A suggested A/B test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestedTest {
    #[serde(default)]
    pub test_name: String,
    #[serde(default)]
    pub hypothesis: String,
    #[serde(default)]
    pub metric: String,
    #[serde(default)]
    pub dimension: String,
}

/// The full payload returned by the external insight generator. Stored and
/// optimized as-is; contents are not validated here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightPayload {
    #[serde(default)]
    pub critical_issues: Vec<CriticalIssue>,
    #[serde(default)]
    pub opportunities: Vec<Opportunity>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub suggested_tests: Vec<SuggestedTest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

// ─── Historical records ─────────────────────────────────────────────────────

/// One day of stored funnel performance, used by the batch processor to
/// size storage-bounded archives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub date: DateTime<Utc>,
    /// Opaque stored metrics; the batch processor only sizes and dates it.
    #[serde(default)]
    pub metrics: serde_json::Value,
}
