//! Turns raw reader output into analysis-ready series.
//!
//! Pipeline order is fixed: rebase to run-relative time, apply the log type's
//! unit transform, then aggregate into 1-second buckets. Step series skip
//! resampling and are instead extended to the chart window edge.

use bwe_report_model::{Reducer, Scale, Series, TimestampedRecord};

/// Extracts one named field as raw `(time_ms, value)` samples.
///
/// Records missing the field are excluded (missing-value policy).
pub fn column(records: &[TimestampedRecord], field: &str) -> Vec<(i64, f64)> {
    records
        .iter()
        .filter_map(|r| r.field(field).map(|v| (r.time_ms, v)))
        .collect()
}

/// Full normalization: rebase, scale, bucket.
pub fn normalize(
    samples: Vec<(i64, f64)>,
    basetime_ms: i64,
    scale: Scale,
    reducer: Reducer,
) -> Series {
    Series::from_points(samples)
        .rebase(basetime_ms)
        .scale(scale)
        .resample(reducer)
}

/// Rebased, unbucketed gauge series (controller traces are plotted sample by
/// sample).
pub fn gauge(samples: Vec<(i64, f64)>, basetime_ms: i64) -> Series {
    Series::from_points(samples).rebase(basetime_ms)
}

/// Target-bitrate series: placeholder (non-positive) samples are dropped
/// before rebasing; the result stays unbucketed.
pub fn target(samples: Vec<(i64, f64)>, basetime_ms: i64) -> Series {
    Series::from_points(samples)
        .retain_positive()
        .rebase(basetime_ms)
}

/// Step series (link capacity): rebased, never resampled, final value held
/// through `window_ms`.
pub fn step(samples: Vec<(i64, f64)>, basetime_ms: i64, window_ms: i64) -> Series {
    Series::from_points(samples)
        .rebase(basetime_ms)
        .extend_step_to(window_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(time_ms: i64, field: &str, value: f64) -> TimestampedRecord {
        let mut r = TimestampedRecord::new(time_ms);
        r.fields.insert(field.to_string(), value);
        r
    }

    #[test]
    fn column_skips_records_without_the_field() {
        let records = vec![
            record(0, "size", 100.0),
            TimestampedRecord::new(50),
            record(100, "size", 200.0),
        ];
        assert_eq!(column(&records, "size"), vec![(0, 100.0), (100, 200.0)]);
    }

    #[test]
    fn normalize_rebases_scales_and_buckets() {
        let basetime = 1_650_000_000_000;
        let samples = vec![
            (basetime + 100, 1_000.0),
            (basetime + 900, 500.0),
            (basetime + 1_100, 250.0),
        ];
        let series = normalize(samples, basetime, Scale::BYTES_TO_BITS, Reducer::Sum);
        assert_eq!(series.points(), &[(0, 12_000.0), (1_000, 2_000.0)]);
    }

    #[test]
    fn target_filters_placeholders_before_rebasing() {
        let samples = vec![(1_000, 0.0), (2_000, 300_000.0), (3_000, -1.0)];
        let series = target(samples, 1_000);
        assert_eq!(series.points(), &[(1_000, 300_000.0)]);
    }

    #[test]
    fn step_holds_capacity_through_window() {
        let samples = vec![(0, 1_000.0), (30_000, 500.0)];
        let series = step(samples, 0, 60_000);
        assert_eq!(
            series.points(),
            &[(0, 1_000.0), (30_000, 500.0), (60_000, 500.0)]
        );
    }
}
