//! Analysis pipeline: metrics, baseline, outliers, ranked views, and the
//! cache fingerprint, assembled into one report.

use chrono::{DateTime, Utc};
use funnel_analysis::{calculate_funnel_metrics, resolve_baseline, OutlierDetector};
use funnel_cache::InsightCache;
use funnel_core::config::AppConfig;
use funnel_core::error::FunnelResult;
use funnel_core::types::{
    AnalysisRequest, BaselineRates, FunnelData, FunnelMetrics, Outlier, OutlierMap,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Everything the external insight generator would receive, plus the
/// fingerprint under which its answer would be cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelReport {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub property_id: String,
    pub date_range: String,
    pub baseline: BaselineRates,
    pub funnel_metrics: FunnelMetrics,
    pub outliers: OutlierMap,
    pub top_opportunities: Vec<Outlier>,
    pub critical_issues: Vec<Outlier>,
    pub fingerprint: String,
}

/// Run the full analysis over one funnel export.
pub fn run_analysis(
    config: &AppConfig,
    data: &FunnelData,
    explicit_baseline: Option<BaselineRates>,
) -> FunnelResult<FunnelReport> {
    let funnel_metrics = calculate_funnel_metrics(data);
    let baseline = resolve_baseline(explicit_baseline.clone(), data);

    let detector = OutlierDetector::new(config.analysis.clone());
    let outliers = detector.detect(&funnel_metrics, &baseline);
    let top_opportunities = detector.top_opportunities(&outliers, None);
    let critical_issues = detector.critical_issues(&outliers, None);

    let request = AnalysisRequest {
        dimensions: data.dimension_breakdowns.keys().cloned().collect(),
        property_id: data.property_id.clone(),
        date_range: data.date_range.clone(),
        baseline_rates: explicit_baseline,
    };
    let fingerprint = InsightCache::fingerprint(&request)?;

    info!(
        property_id = %data.property_id,
        outlier_dimensions = outliers.len(),
        opportunities = top_opportunities.len(),
        issues = critical_issues.len(),
        "Analysis complete"
    );

    Ok(FunnelReport {
        report_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        property_id: data.property_id.clone(),
        date_range: data.date_range.clone(),
        baseline,
        funnel_metrics,
        outliers,
        top_opportunities,
        critical_issues,
        fingerprint,
    })
}
