use std::collections::HashMap;

/// One parsed log row: a timestamp plus the named numeric fields that were
/// successfully extracted from it.
///
/// Cells that fail numeric parsing are simply absent from `fields`; a missing
/// field excludes the record from that series, it is not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampedRecord {
    pub time_ms: i64,
    pub fields: HashMap<String, f64>,
}

impl TimestampedRecord {
    pub fn new(time_ms: i64) -> Self {
        Self {
            time_ms,
            fields: HashMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }
}

/// A record keyed by a monotonically assigned sequence number, used to join a
/// sent-side log against the matching received-side log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencedRecord {
    pub seq: u64,
    pub time_ms: i64,
}

impl SequencedRecord {
    pub fn new(seq: u64, time_ms: i64) -> Self {
        Self { seq, time_ms }
    }
}
