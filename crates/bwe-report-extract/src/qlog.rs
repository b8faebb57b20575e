//! Reader for qlog JSON-lines event logs (QUIC transport internals).
//!
//! Each line is an independent JSON object `{time, name, data}`. Lines whose
//! event name is not selected are ignored; a line that is not valid JSON is
//! fatal for the report, since these logs are machine-written.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{ExtractError, Result};

const METRICS_UPDATED: &str = "recovery:metrics_updated";

#[derive(Deserialize, Debug)]
struct QlogEvent {
    // The leading qlog header object carries no time; default keeps it
    // parseable, its empty name excludes it from every selector.
    #[serde(default)]
    time: f64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    data: Value,
}

/// Raw samples gathered from `recovery:metrics_updated` events.
///
/// An event contributes a sample to each series whose field it actually
/// carries; qlog emits partial updates.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MetricsSamples {
    pub smoothed_rtt: Vec<(i64, f64)>,
    pub min_rtt: Vec<(i64, f64)>,
    pub latest_rtt: Vec<(i64, f64)>,
    pub bytes_in_flight: Vec<(i64, f64)>,
    pub congestion_window: Vec<(i64, f64)>,
}

impl MetricsSamples {
    pub fn is_empty(&self) -> bool {
        self.smoothed_rtt.is_empty()
            && self.min_rtt.is_empty()
            && self.latest_rtt.is_empty()
            && self.bytes_in_flight.is_empty()
            && self.congestion_window.is_empty()
    }
}

/// Which packet events to scan for frame payload sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketEvent {
    Sent,
    Received,
}

impl PacketEvent {
    fn name(self) -> &'static str {
        match self {
            PacketEvent::Sent => "transport:packet_sent",
            PacketEvent::Received => "transport:packet_received",
        }
    }
}

/// Per-event frame byte counts, split by frame type.
///
/// `total` carries one sample per contributing frame class per event; summing
/// a bucket therefore matches `datagram + stream` for that bucket.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FrameBytes {
    pub datagram: Vec<(i64, f64)>,
    pub stream: Vec<(i64, f64)>,
    pub total: Vec<(i64, f64)>,
}

impl FrameBytes {
    pub fn is_empty(&self) -> bool {
        self.total.is_empty()
    }
}

/// Scans a qlog for recovery metrics. `Ok(None)` if the file is absent.
pub fn read_metrics(path: &Path) -> Result<Option<MetricsSamples>> {
    let Some(events) = read_events(path)? else {
        return Ok(None);
    };

    let mut samples = MetricsSamples::default();
    for event in events {
        if event.name != METRICS_UPDATED {
            continue;
        }
        let time = event.time as i64;
        let take = |field: &str, out: &mut Vec<(i64, f64)>| {
            if let Some(value) = event.data.get(field).and_then(Value::as_f64) {
                out.push((time, value));
            }
        };
        take("smoothed_rtt", &mut samples.smoothed_rtt);
        take("min_rtt", &mut samples.min_rtt);
        take("latest_rtt", &mut samples.latest_rtt);
        take("bytes_in_flight", &mut samples.bytes_in_flight);
        take("congestion_window", &mut samples.congestion_window);
    }
    Ok(Some(samples))
}

/// Scans a qlog for packet events and sums frame lengths per event, split by
/// `datagram` and `stream` frame types. `Ok(None)` if the file is absent.
pub fn read_frame_bytes(path: &Path, event: PacketEvent) -> Result<Option<FrameBytes>> {
    let Some(events) = read_events(path)? else {
        return Ok(None);
    };

    let mut bytes = FrameBytes::default();
    for parsed in events {
        if parsed.name != event.name() {
            continue;
        }
        let Some(frames) = parsed.data.get("frames").and_then(Value::as_array) else {
            continue;
        };
        let time = parsed.time as i64;

        let sum_of = |frame_type: &str| -> f64 {
            frames
                .iter()
                .filter(|f| f.get("frame_type").and_then(Value::as_str) == Some(frame_type))
                .filter_map(|f| f.get("length").and_then(Value::as_f64))
                .sum()
        };

        let datagram = sum_of("datagram");
        if datagram > 0.0 {
            bytes.datagram.push((time, datagram));
            bytes.total.push((time, datagram));
        }
        let stream = sum_of("stream");
        if stream > 0.0 {
            bytes.stream.push((time, stream));
            bytes.total.push((time, stream));
        }
    }
    Ok(Some(bytes))
}

/// Finds the side's qlog. The testbed writes one qlog per connection with a
/// generated name, so the first `.qlog` file (lexicographically) wins.
pub fn find_qlog(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut qlogs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "qlog"))
        .collect();
    qlogs.sort();
    qlogs.into_iter().next()
}

fn read_events(path: &Path) -> Result<Option<Vec<QlogEvent>>> {
    if !path.exists() {
        debug!(path = %path.display(), "qlog not present, skipping");
        return Ok(None);
    }
    let file = File::open(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut events = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let event: QlogEvent =
            serde_json::from_str(trimmed).map_err(|source| ExtractError::MalformedEvent {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            })?;
        events.push(event);
    }
    Ok(Some(events))
}
