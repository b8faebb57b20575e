//! Reader for iperf-style JSON interval reports (the TCP cross-traffic logs).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{ExtractError, Result};

#[derive(Deserialize, Debug)]
struct IntervalReport {
    intervals: Vec<Interval>,
}

#[derive(Deserialize, Debug)]
struct Interval {
    sum: IntervalSum,
}

#[derive(Deserialize, Debug)]
struct IntervalSum {
    start: f64,
    bits_per_second: f64,
}

/// Reads the interval report into `(time_ms, bits_per_second)` samples.
///
/// Interval start times are relative seconds; they are converted to
/// milliseconds here so downstream bucketing is uniform. `Ok(None)` if the
/// file is absent; a present file that is not a valid report is fatal.
pub fn read_intervals(path: &Path) -> Result<Option<Vec<(i64, f64)>>> {
    if !path.exists() {
        debug!(path = %path.display(), "interval report not present, skipping");
        return Ok(None);
    }
    let file = File::open(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let report: IntervalReport = serde_json::from_reader(BufReader::new(file)).map_err(
        |source| ExtractError::MalformedReport {
            path: path.to_path_buf(),
            source,
        },
    )?;

    let samples = report
        .intervals
        .iter()
        .map(|i| ((i.sum.start * 1_000.0) as i64, i.sum.bits_per_second))
        .collect();
    Ok(Some(samples))
}
