use serde::{Deserialize, Serialize};

/// Width of a resampling bucket in milliseconds.
pub const BUCKET_MS: i64 = 1_000;

/// Fixed linear unit transform applied to every value of a series.
///
/// The factor is a property of the log type (wire sizes are logged in bytes,
/// some controllers log durations in microseconds), never of the data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale(pub f64);

impl Scale {
    pub const IDENTITY: Scale = Scale(1.0);
    pub const BYTES_TO_BITS: Scale = Scale(8.0);
    pub const MICROS_TO_MILLIS: Scale = Scale(1e-3);

    pub fn apply(self, value: f64) -> f64 {
        value * self.0
    }

    pub fn invert(self) -> Scale {
        Scale(1.0 / self.0)
    }
}

/// How samples falling into the same bucket are combined.
///
/// `Sum` is used for per-interval throughput quantities (bytes or packets per
/// interval), `Mean` for gauges (RTT, window size, bitrate targets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Sum,
    Mean,
}

/// An ordered sequence of `(timestamp_ms, value)` pairs.
///
/// Timestamps ascend. After [`Series::resample`] there is exactly one point
/// per occupied 1-second bucket; empty buckets are omitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    points: Vec<(i64, f64)>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a series from raw samples, sorting them by timestamp.
    ///
    /// The sort is stable so samples sharing a timestamp keep file order.
    pub fn from_points(mut points: Vec<(i64, f64)>) -> Self {
        points.sort_by_key(|&(t, _)| t);
        Series { points }
    }

    pub fn points(&self) -> &[(i64, f64)] {
        &self.points
    }

    pub fn into_points(self) -> Vec<(i64, f64)> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_time(&self) -> Option<i64> {
        self.points.first().map(|&(t, _)| t)
    }

    pub fn last_time(&self) -> Option<i64> {
        self.points.last().map(|&(t, _)| t)
    }

    /// Shifts every timestamp to run-relative time (`t - basetime`).
    pub fn rebase(self, basetime_ms: i64) -> Series {
        Series {
            points: self
                .points
                .into_iter()
                .map(|(t, v)| (t - basetime_ms, v))
                .collect(),
        }
    }

    /// Applies a fixed linear unit transform to every value.
    pub fn scale(self, scale: Scale) -> Series {
        Series {
            points: self
                .points
                .into_iter()
                .map(|(t, v)| (t, scale.apply(v)))
                .collect(),
        }
    }

    /// Drops points whose value is not strictly positive.
    ///
    /// Target-bitrate logs emit zero as a "no estimate yet" placeholder; kept
    /// as-is those points draw a spurious floor at the start of the chart.
    pub fn retain_positive(self) -> Series {
        Series {
            points: self.points.into_iter().filter(|&(_, v)| v > 0.0).collect(),
        }
    }

    /// Aggregates samples into fixed 1-second buckets.
    ///
    /// The bucket key is the truncated timestamp (`div_euclid`, so samples at
    /// negative run-relative times still land in a well-defined bucket).
    /// Buckets without samples are omitted.
    pub fn resample(&self, reducer: Reducer) -> Series {
        let mut out: Vec<(i64, f64)> = Vec::new();
        let mut current: Option<(i64, f64, u32)> = None;

        // Points are already time-ordered, so a single pass suffices.
        for &(t, v) in &self.points {
            let bucket = t.div_euclid(BUCKET_MS) * BUCKET_MS;
            match current {
                Some((b, acc, n)) if b == bucket => {
                    current = Some((b, acc + v, n + 1));
                }
                Some((b, acc, n)) => {
                    out.push((b, reduce(reducer, acc, n)));
                    current = Some((bucket, v, 1));
                }
                None => current = Some((bucket, v, 1)),
            }
        }
        if let Some((b, acc, n)) = current {
            out.push((b, reduce(reducer, acc, n)));
        }

        Series { points: out }
    }

    /// Extends a step series so its final held value reaches `end_ms`.
    ///
    /// Step series (link capacity) are never resampled: each change-point
    /// holds until the next one. Without this the plotted line stops at the
    /// last change-point instead of the true end of the run.
    pub fn extend_step_to(mut self, end_ms: i64) -> Series {
        if let Some(&(t, v)) = self.points.last()
            && t < end_ms
        {
            self.points.push((end_ms, v));
        }
        self
    }
}

fn reduce(reducer: Reducer, acc: f64, n: u32) -> f64 {
    match reducer {
        Reducer::Sum => acc,
        Reducer::Mean => acc / f64::from(n),
    }
}
