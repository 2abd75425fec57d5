//! Funnel metrics calculation — per-dimension conversion rates and dropoffs.

use funnel_core::types::{DimensionMetric, FunnelData, FunnelMetrics};
use std::collections::BTreeMap;
use tracing::debug;

/// Round a rate to 4 decimal places.
pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Ratio of two counts, 0 when the denominator is 0.
pub(crate) fn safe_rate(numerator: u64, denominator: u64) -> f64 {
    if denominator > 0 {
        numerator as f64 / denominator as f64
    } else {
        0.0
    }
}

/// Calculate completion rates for each funnel step across all dimensions.
///
/// Pure transform: raw counts in, one [`DimensionMetric`] per
/// (dimension, value) pair out. Zero denominators produce 0 rates; dropoffs
/// are plain signed subtractions and go negative on malformed input.
pub fn calculate_funnel_metrics(funnel_data: &FunnelData) -> FunnelMetrics {
    let mut results = FunnelMetrics::new();

    for (dimension, values) in &funnel_data.dimension_breakdowns {
        let mut dimension_results = BTreeMap::new();

        for (value, steps) in values {
            let view_to_cart = safe_rate(steps.add_to_cart, steps.view_item);
            let cart_to_purchase = safe_rate(steps.purchase, steps.add_to_cart);
            let overall = safe_rate(steps.purchase, steps.view_item);

            dimension_results.insert(
                value.clone(),
                DimensionMetric {
                    view_to_cart_rate: round4(view_to_cart),
                    cart_to_purchase_rate: round4(cart_to_purchase),
                    overall_conversion_rate: round4(overall),
                    absolute_numbers: *steps,
                    view_to_cart_dropoff: steps.view_item as i64 - steps.add_to_cart as i64,
                    cart_to_purchase_dropoff: steps.add_to_cart as i64 - steps.purchase as i64,
                },
            );
        }

        results.insert(dimension.clone(), dimension_results);
    }

    debug!(
        dimensions = results.len(),
        "Calculated funnel metrics"
    );

    results
}
