use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning log files into series.
///
/// A missing file is never an error (readers return `None` for it); these
/// cover present-but-unreadable inputs, which abort the whole report.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed row {line} in {}: {reason}", .path.display())]
    MalformedRow {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("invalid delimited log {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed event log line {line} in {}: {source}", .path.display())]
    MalformedEvent {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed interval report {}: {source}", .path.display())]
    MalformedReport {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ExtractError>;
