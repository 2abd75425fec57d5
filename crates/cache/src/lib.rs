#![warn(clippy::unwrap_used)]

pub mod batch;
pub mod insights;
pub mod pacer;
pub mod storage;

pub use batch::{BatchProcessor, RetentionPartition};
pub use insights::{CacheStats, InsightCache};
pub use pacer::CallPacer;
pub use storage::{
    estimate_storage_usage, optimize_for_storage, optimize_payload, OptimizedInsights,
    StorageEstimate, StorageOptimization,
};
