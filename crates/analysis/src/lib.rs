//! Funnel metrics and outlier detection — conversion rates per dimension,
//! baseline resolution, and threshold-based deviation flagging.

pub mod baseline;
pub mod metrics;
pub mod outlier;

pub use baseline::{calculate_baseline_from_data, resolve_baseline};
pub use metrics::calculate_funnel_metrics;
pub use outlier::OutlierDetector;
