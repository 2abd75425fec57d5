//! Baseline resolution — explicit caller-supplied rates, or a global
//! baseline derived by summing counts across every dimension value.

use crate::metrics::{round4, safe_rate};
use funnel_core::types::{BaselineRates, FunnelData, StepCounts};
use tracing::debug;

/// Resolve the baseline for an analysis: a caller-supplied baseline wins
/// verbatim, otherwise one is derived from the data itself.
pub fn resolve_baseline(explicit: Option<BaselineRates>, funnel_data: &FunnelData) -> BaselineRates {
    match explicit {
        Some(baseline) => baseline,
        None => calculate_baseline_from_data(funnel_data),
    }
}

/// Calculate overall baseline rates from dimension breakdowns.
///
/// Sums absolute counts across every (dimension, value) pair and applies the
/// same ratio formulas as the metrics calculator to the totals. Summing
/// counts rather than averaging per-bucket rates keeps the baseline
/// independent of how many buckets a dimension happens to have.
pub fn calculate_baseline_from_data(funnel_data: &FunnelData) -> BaselineRates {
    let mut totals = StepCounts::default();

    for values in funnel_data.dimension_breakdowns.values() {
        for steps in values.values() {
            totals.view_item += steps.view_item;
            totals.add_to_cart += steps.add_to_cart;
            totals.purchase += steps.purchase;
        }
    }

    let baseline = BaselineRates {
        view_item_to_add_to_cart: round4(safe_rate(totals.add_to_cart, totals.view_item)),
        add_to_cart_to_purchase: round4(safe_rate(totals.purchase, totals.add_to_cart)),
        overall_conversion: round4(safe_rate(totals.purchase, totals.view_item)),
        total_events: Some(totals),
    };

    debug!(
        view_to_cart = baseline.view_item_to_add_to_cart,
        cart_to_purchase = baseline.add_to_cart_to_purchase,
        overall = baseline.overall_conversion,
        "Derived baseline from data"
    );

    baseline
}
