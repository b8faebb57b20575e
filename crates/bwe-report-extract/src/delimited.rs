//! Reader for the headerless, comma-delimited per-packet logs written by the
//! testbed's interceptors.
//!
//! Column positions are significant and fixed per log type; the layouts in
//! [`layouts`] mirror the logger formats on the Go side.

use std::path::Path;

use bwe_report_model::{SequencedRecord, TimestampedRecord};
use tracing::debug;

use crate::error::{ExtractError, Result};

/// Which columns of a delimited log to extract, and what to call them.
#[derive(Debug, Clone, Copy)]
pub struct ColumnLayout {
    pub time_column: usize,
    pub columns: &'static [(usize, &'static str)],
}

pub mod layouts {
    use super::ColumnLayout;

    /// RTP packet log: `time, payload_type, ssrc, seq, rtp_ts, marker, size`.
    pub const RTP: ColumnLayout = ColumnLayout {
        time_column: 0,
        columns: &[(6, "size")],
    };

    /// RTP packet log, sequence-number view (for the sent/received join).
    pub const RTP_SEQUENCED: ColumnLayout = ColumnLayout {
        time_column: 0,
        columns: &[(3, "seq")],
    };

    /// RTCP rate log: `time, size`.
    pub const RTCP: ColumnLayout = ColumnLayout {
        time_column: 0,
        columns: &[(1, "size")],
    };

    /// Congestion-controller target log: `time, target`.
    pub const TARGET: ColumnLayout = ColumnLayout {
        time_column: 0,
        columns: &[(1, "target")],
    };

    /// GCC delay-controller trace.
    pub const GCC: ColumnLayout = ColumnLayout {
        time_column: 0,
        columns: &[
            (3, "average_loss"),
            (5, "measurement"),
            (6, "estimate"),
            (7, "threshold"),
            (8, "rtt"),
        ],
    };

    /// SCReAM controller trace.
    pub const SCREAM: ColumnLayout = ColumnLayout {
        time_column: 0,
        columns: &[
            (2, "queue_delay"),
            (3, "srtt"),
            (4, "cwnd"),
            (5, "bytes_in_flight"),
            (6, "rate_lost"),
            (7, "rate_transmitted"),
            (8, "rate_acked"),
        ],
    };

    /// Router capacity log: `time, bandwidth`. Plotted as a step series.
    pub const ROUTER: ColumnLayout = ColumnLayout {
        time_column: 0,
        columns: &[(1, "bandwidth")],
    };
}

/// Reads a delimited log into records.
///
/// Returns `Ok(None)` if the file does not exist: a flow that never produced
/// this log is a normal outcome and the dependent chart is skipped. A row
/// that lacks a selected column or carries an unparsable timestamp is fatal;
/// a value cell that is not numeric is treated as missing.
pub fn read_records(path: &Path, layout: &ColumnLayout) -> Result<Option<Vec<TimestampedRecord>>> {
    if !path.exists() {
        debug!(path = %path.display(), "log not present, skipping");
        return Ok(None);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| ExtractError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let line = index + 1;
        let row = row.map_err(|source| ExtractError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

        let cell = row
            .get(layout.time_column)
            .ok_or_else(|| malformed(path, line, "missing timestamp column"))?;
        let time: f64 = cell
            .parse()
            .map_err(|_| malformed(path, line, "unparsable timestamp"))?;
        if !time.is_finite() {
            return Err(malformed(path, line, "non-finite timestamp"));
        }

        let mut record = TimestampedRecord::new(time as i64);
        for &(column, name) in layout.columns {
            let cell = row.get(column).ok_or_else(|| {
                malformed(path, line, &format!("missing column {column} ({name})"))
            })?;
            // Non-numeric cells are missing values, not errors.
            if let Ok(value) = cell.parse::<f64>() {
                record.fields.insert(name.to_string(), value);
            }
        }
        records.push(record);
    }

    Ok(Some(records))
}

/// Reads the sequence-number view of a packet log.
///
/// Rows whose sequence cell is non-numeric are excluded (missing value
/// policy), since they cannot participate in the join.
pub fn read_sequenced(path: &Path, layout: &ColumnLayout) -> Result<Option<Vec<SequencedRecord>>> {
    let Some(records) = read_records(path, layout)? else {
        return Ok(None);
    };
    let (_, seq_field) = layout.columns[0];
    let sequenced = records
        .iter()
        .filter_map(|r| {
            r.field(seq_field)
                .map(|seq| SequencedRecord::new(seq as u64, r.time_ms))
        })
        .collect();
    Ok(Some(sequenced))
}

fn malformed(path: &Path, line: usize, reason: &str) -> ExtractError {
    ExtractError::MalformedRow {
        path: path.to_path_buf(),
        line,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_log(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_none() {
        let dir = TempDir::new().unwrap();
        let result = read_records(&dir.path().join("rtp_out.log"), &layouts::RTP).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn reads_rtp_rows_by_position() {
        let dir = TempDir::new().unwrap();
        let path = write_log(
            &dir,
            "rtp_out.log",
            "1650000000000, 96, 1234, 7, 90000, false, 1200\n\
             1650000000020, 96, 1234, 8, 90000, true, 800\n",
        );

        let records = read_records(&path, &layouts::RTP).unwrap().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].time_ms, 1_650_000_000_000);
        assert_eq!(records[0].field("size"), Some(1_200.0));
        assert_eq!(records[1].field("size"), Some(800.0));
    }

    #[test]
    fn non_numeric_value_cell_is_missing_not_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, "scream.log", "1000, x, n/a, 1.5, 10, 20, -, 30, 40\n");

        let records = read_records(&path, &layouts::SCREAM).unwrap().unwrap();
        assert_eq!(records[0].field("rate_lost"), None);
        assert_eq!(records[0].field("queue_delay"), None);
        assert_eq!(records[0].field("srtt"), Some(1.5));
        assert_eq!(records[0].field("rate_acked"), Some(40.0));
    }

    #[test]
    fn short_row_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, "rtp_out.log", "1000, 96, 1234\n");

        let err = read_records(&path, &layouts::RTP).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedRow { line: 1, .. }));
    }

    #[test]
    fn unparsable_timestamp_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, "router.log", "soon, 1000000\n");

        let err = read_records(&path, &layouts::ROUTER).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedRow { line: 1, .. }));
    }

    #[test]
    fn sequenced_view_extracts_join_keys() {
        let dir = TempDir::new().unwrap();
        let path = write_log(
            &dir,
            "rtp_out.log",
            "100, 96, 1234, 1, 90000, false, 1200\n\
             200, 96, 1234, 2, 90000, false, 1200\n",
        );

        let records = read_sequenced(&path, &layouts::RTP_SEQUENCED)
            .unwrap()
            .unwrap();
        assert_eq!(
            records,
            vec![SequencedRecord::new(1, 100), SequencedRecord::new(2, 200)]
        );
    }
}
