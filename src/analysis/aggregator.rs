//! Per-region telemetry aggregation.
//!
//! This module computes descriptive statistics (mean, 95th percentile,
//! threshold breaches) over the samples recorded for each requested region.

use crate::dataset::Dataset;
use crate::models::{LatencyReport, RegionStats, TelemetryRecord};
use tracing::debug;

/// Percentile reported as `p95_latency`.
const P95: f64 = 95.0;

impl RegionStats {
    /// Compute statistics from the records of a single region.
    ///
    /// Returns `None` when `records` is empty.
    pub fn from_records(records: &[&TelemetryRecord], threshold_ms: f64) -> Option<Self> {
        let latencies: Vec<f64> = records.iter().map(|r| r.latency_ms).collect();
        let uptimes: Vec<f64> = records.iter().map(|r| r.uptime_pct).collect();

        Some(Self {
            avg_latency: round_to(mean(&latencies)?, 2),
            p95_latency: round_to(percentile(&latencies, P95)?, 2),
            avg_uptime: round_to(mean(&uptimes)?, 3),
            breaches: count_breaches(&latencies, threshold_ms),
        })
    }
}

/// Aggregate statistics for each requested region.
///
/// Regions are processed in request order. Regions with no samples are
/// omitted; a repeated region overwrites its earlier entry in place.
pub fn compute(dataset: &Dataset, regions: &[String], threshold_ms: f64) -> LatencyReport {
    let mut report = LatencyReport::new();

    for region in regions {
        let records = dataset.records_for_region(region);
        match RegionStats::from_records(&records, threshold_ms) {
            Some(stats) => {
                report.insert(region.clone(), stats);
            }
            None => debug!("No samples for region '{}', skipping", region),
        }
    }

    report
}

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Percentile with linear interpolation between the closest ranks.
///
/// `pct` is clamped to `0..=100`. `None` for an empty slice.
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Round to a fixed number of decimal places.
///
/// Rounds the exact binary value, ties to even, so `91.505` (stored just
/// below the half) becomes `91.5`.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{:.*}", decimals, value).parse().unwrap_or(value)
}

/// Count samples strictly above the threshold.
pub fn count_breaches(latencies: &[f64], threshold_ms: f64) -> usize {
    latencies.iter().filter(|&&l| l > threshold_ms).count()
}
