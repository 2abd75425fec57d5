//! Historical-record batching — sizes batches to fit the storage budget
//! and partitions records by the retention window.

use chrono::{DateTime, Duration, Utc};
use funnel_core::config::StorageConfig;
use funnel_core::error::FunnelResult;
use funnel_core::types::HistoricalRecord;
use serde::Serialize;
use tracing::{debug, info};

/// Historical records split at the retention cutoff.
#[derive(Debug, Clone, Default)]
pub struct RetentionPartition {
    /// Records within the retention window, retained in full detail.
    pub recent: Vec<HistoricalRecord>,
    /// Records older than the window. Currently dropped by callers.
    pub older: Vec<HistoricalRecord>,
}

/// Sizes historical-record batches so each chunk's estimated serialized
/// size stays within the configured storage budget.
pub struct BatchProcessor {
    max_batch_size: usize,
    max_storage_bytes: f64,
    retention_days: i64,
}

impl BatchProcessor {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            max_batch_size: config.max_batch_size,
            max_storage_bytes: config.max_storage_mb * 1024.0 * 1024.0,
            retention_days: config.retention_days,
        }
    }

    /// Batch size that keeps `total_records` within the storage budget,
    /// estimated from one sample record.
    ///
    /// When the full set fits, the batch is simply capped at
    /// `max_batch_size`. When it does not, the budget is spread over a
    /// ~30-period rotation window so older batches can be rotated out. A
    /// zero-sized sample record falls back to `max_batch_size` instead of
    /// dividing.
    pub fn optimal_batch_size(
        &self,
        sample_record: &impl Serialize,
        total_records: usize,
    ) -> FunnelResult<usize> {
        let record_size = serde_json::to_string(sample_record)?.len();

        if record_size == 0 {
            return Ok(self.max_batch_size);
        }

        // 80% of the budget, to leave headroom for serialization overhead.
        let max_records = (self.max_storage_bytes / record_size as f64 * 0.8) as usize;

        let batch_size = if total_records <= max_records {
            std::cmp::min(total_records, self.max_batch_size)
        } else {
            std::cmp::min(max_records / 30, self.max_batch_size)
        };

        debug!(
            batch_size,
            record_size, total_records, "Calculated optimal batch size"
        );
        Ok(batch_size)
    }

    /// Split records into contiguous batches. The batch size is computed
    /// from the first record when not supplied.
    pub fn batch_records(
        &self,
        records: &[HistoricalRecord],
        batch_size: Option<usize>,
    ) -> FunnelResult<Vec<Vec<HistoricalRecord>>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let batch_size = match batch_size {
            Some(size) => size,
            None => self.optimal_batch_size(&records[0], records.len())?,
        };
        // Chunk size must never be zero.
        let batch_size = std::cmp::max(1, batch_size);

        let batches: Vec<Vec<HistoricalRecord>> = records
            .chunks(batch_size)
            .map(|chunk| chunk.to_vec())
            .collect();

        info!(
            batches = batches.len(),
            records = records.len(),
            "Created historical batches"
        );
        Ok(batches)
    }

    /// Partition records at the retention cutoff. Only the recent partition
    /// is retained in full by callers.
    // TODO: roll the older partition up into daily (31-90 days) and weekly
    // (90+ days) summaries instead of letting callers drop it.
    pub fn partition_by_retention(
        &self,
        records: &[HistoricalRecord],
        now: DateTime<Utc>,
    ) -> RetentionPartition {
        let cutoff = now - Duration::days(self.retention_days);

        let mut partition = RetentionPartition::default();
        for record in records {
            if record.date >= cutoff {
                partition.recent.push(record.clone());
            } else {
                partition.older.push(record.clone());
            }
        }

        if !partition.older.is_empty() {
            info!(
                older = partition.older.len(),
                recent = partition.recent.len(),
                "Partitioned historical records at retention cutoff"
            );
        }

        partition
    }
}
