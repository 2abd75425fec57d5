//! Mock funnel dataset with industry-realistic rates and planted outliers,
//! for demos and local runs without a real analytics export.

use chrono::{Duration, Utc};
use funnel_core::types::{BaselineRates, FunnelData, HistoricalRecord, StepCounts};
use rand::Rng;
use serde_json::json;
use std::collections::BTreeMap;

fn counts(view_item: u64, add_to_cart: u64, purchase: u64) -> StepCounts {
    StepCounts {
        view_item,
        add_to_cart,
        purchase,
    }
}

/// Industry-realistic ecommerce baseline: 15.2% add-to-cart, 8.7% checkout
/// completion, 1.32% overall conversion.
pub fn mock_baseline() -> BaselineRates {
    BaselineRates {
        view_item_to_add_to_cart: 0.152,
        add_to_cart_to_purchase: 0.087,
        overall_conversion: 0.0132,
        total_events: None,
    }
}

/// A funnel export with intentional outliers: Social badly underperforms
/// add-to-cart, Email and desktop overperform, tablet barely converts.
pub fn generate_mock_funnel_data(property_id: &str, date_range: &str) -> FunnelData {
    let mut dimension_breakdowns = BTreeMap::new();

    let mut channel = BTreeMap::new();
    channel.insert("Organic Search".to_string(), counts(1000, 183, 16));
    channel.insert("Social".to_string(), counts(800, 65, 5));
    channel.insert("Email".to_string(), counts(500, 107, 12));
    channel.insert("Direct".to_string(), counts(1200, 178, 15));
    channel.insert("Paid Search".to_string(), counts(600, 96, 10));
    dimension_breakdowns.insert("sessionDefaultChannelGroup".to_string(), channel);

    let mut device = BTreeMap::new();
    device.insert("desktop".to_string(), counts(2000, 378, 42));
    device.insert("mobile".to_string(), counts(1800, 203, 16));
    device.insert("tablet".to_string(), counts(300, 52, 2));
    dimension_breakdowns.insert("deviceCategory".to_string(), device);

    let mut product = BTreeMap::new();
    product.insert("China Mugs".to_string(), counts(1200, 252, 25));
    product.insert("Photo Canvas".to_string(), counts(800, 128, 12));
    product.insert("Personalised Socks".to_string(), counts(600, 72, 6));
    product.insert("Tea Towels".to_string(), counts(900, 81, 7));
    product.insert("Photo Blankets".to_string(), counts(700, 112, 10));
    dimension_breakdowns.insert("itemName".to_string(), product);

    FunnelData {
        property_id: property_id.to_string(),
        date_range: date_range.to_string(),
        funnel_steps: vec![
            "view_item".to_string(),
            "add_to_cart".to_string(),
            "purchase".to_string(),
        ],
        dimension_breakdowns,
    }
}

/// Historical daily rates around the baseline with ±5% jitter.
pub fn generate_historical_data(days: i64) -> Vec<HistoricalRecord> {
    let mut rng = rand::thread_rng();
    let now = Utc::now();

    (0..days)
        .map(|i| {
            let variation = 1.0 + rng.gen_range(-0.05..0.05);
            HistoricalRecord {
                date: now - Duration::days(days - i),
                metrics: json!({
                    "view_item_to_add_to_cart": round4(0.152 * variation),
                    "add_to_cart_to_purchase": round4(0.087 * variation),
                    "overall_conversion": round4(0.0132 * variation),
                    "total_view_item": rng.gen_range(3800..=4200),
                }),
            }
        })
        .collect()
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
