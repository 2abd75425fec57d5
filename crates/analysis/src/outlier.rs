//! Outlier detection — flags dimension values deviating from baseline
//! beyond a configured threshold and ranks them for downstream triage.

use crate::metrics::round4;
use funnel_core::config::AnalysisConfig;
use funnel_core::types::{
    BaselineRates, FunnelMetrics, Outlier, OutlierMap, Performance, Severity,
};
use tracing::info;

/// Threshold-based outlier detector with configurable severity bands.
pub struct OutlierDetector {
    config: AnalysisConfig,
}

impl OutlierDetector {
    /// Create a detector with the given thresholds.
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Detect dimension values performing significantly above or below
    /// baseline.
    ///
    /// A value is skipped outright when either step baseline is zero (the
    /// comparison is undefined); a zero overall baseline yields a zero
    /// overall deviation instead of a division. A value is an outlier when
    /// any of its three deviations exceeds the threshold in absolute value,
    /// strictly. Per-dimension lists are sorted by descending
    /// |overall_deviation|.
    pub fn detect(&self, funnel_metrics: &FunnelMetrics, baseline: &BaselineRates) -> OutlierMap {
        let threshold = self.config.outlier_threshold;
        let mut outliers = OutlierMap::new();

        for (dimension, values) in funnel_metrics {
            let mut dimension_outliers = Vec::new();

            for (value, metrics) in values {
                if baseline.view_item_to_add_to_cart == 0.0
                    || baseline.add_to_cart_to_purchase == 0.0
                {
                    continue;
                }

                let view_to_cart_deviation = (metrics.view_to_cart_rate
                    - baseline.view_item_to_add_to_cart)
                    / baseline.view_item_to_add_to_cart;

                let cart_to_purchase_deviation = (metrics.cart_to_purchase_rate
                    - baseline.add_to_cart_to_purchase)
                    / baseline.add_to_cart_to_purchase;

                let overall_deviation = if baseline.overall_conversion == 0.0 {
                    0.0
                } else {
                    (metrics.overall_conversion_rate - baseline.overall_conversion)
                        / baseline.overall_conversion
                };

                let is_outlier = view_to_cart_deviation.abs() > threshold
                    || cart_to_purchase_deviation.abs() > threshold
                    || overall_deviation.abs() > threshold;

                if is_outlier {
                    dimension_outliers.push(Outlier {
                        dimension: dimension.clone(),
                        dimension_value: value.clone(),
                        view_to_cart_rate: metrics.view_to_cart_rate,
                        cart_to_purchase_rate: metrics.cart_to_purchase_rate,
                        overall_conversion_rate: metrics.overall_conversion_rate,
                        view_to_cart_deviation: round4(view_to_cart_deviation),
                        cart_to_purchase_deviation: round4(cart_to_purchase_deviation),
                        overall_deviation: round4(overall_deviation),
                        absolute_numbers: metrics.absolute_numbers,
                        performance: if overall_deviation > 0.0 {
                            Performance::Above
                        } else {
                            Performance::Below
                        },
                        severity: self.severity(overall_deviation),
                    });
                }
            }

            if !dimension_outliers.is_empty() {
                dimension_outliers.sort_by(|a, b| {
                    b.overall_deviation
                        .abs()
                        .total_cmp(&a.overall_deviation.abs())
                });
                outliers.insert(dimension.clone(), dimension_outliers);
            }
        }

        info!(
            dimensions = outliers.len(),
            total = outliers.values().map(|v| v.len()).sum::<usize>(),
            "Outlier detection complete"
        );

        outliers
    }

    /// Severity of a deviation relative to the configured bands.
    pub fn severity(&self, deviation: f64) -> Severity {
        let abs_deviation = deviation.abs();
        let threshold = self.config.outlier_threshold;

        if abs_deviation >= threshold * self.config.critical_multiplier {
            Severity::Critical
        } else if abs_deviation >= threshold * self.config.high_multiplier {
            Severity::High
        } else if abs_deviation >= threshold {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// Positive outliers across all dimensions, highest overall deviation
    /// first.
    pub fn top_opportunities(&self, outliers: &OutlierMap, limit: Option<usize>) -> Vec<Outlier> {
        let limit = limit.unwrap_or(self.config.ranked_limit);

        let mut opportunities: Vec<Outlier> = outliers
            .values()
            .flatten()
            .filter(|o| o.performance == Performance::Above)
            .cloned()
            .collect();

        opportunities.sort_by(|a, b| b.overall_deviation.total_cmp(&a.overall_deviation));
        opportunities.truncate(limit);
        opportunities
    }

    /// Negative outliers across all dimensions, ordered by severity rank and
    /// then by descending |overall_deviation|.
    pub fn critical_issues(&self, outliers: &OutlierMap, limit: Option<usize>) -> Vec<Outlier> {
        let limit = limit.unwrap_or(self.config.ranked_limit);

        let mut issues: Vec<Outlier> = outliers
            .values()
            .flatten()
            .filter(|o| o.performance == Performance::Below)
            .cloned()
            .collect();

        issues.sort_by(|a, b| {
            a.severity.rank().cmp(&b.severity.rank()).then(
                b.overall_deviation
                    .abs()
                    .total_cmp(&a.overall_deviation.abs()),
            )
        });
        issues.truncate(limit);
        issues
    }
}
