use std::io;

use crate::series::Series;

/// How a series is drawn.
///
/// `Step` series hold their value between change-points (link capacity);
/// everything else is a plain line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Line,
    Step,
}

/// A labelled series inside a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSeries {
    pub label: String,
    pub kind: SeriesKind,
    pub series: Series,
}

/// An assembled chart: a title, the y-axis unit, and an ordered list of
/// labelled series.
///
/// Series handed to a [`ChartSink`] are already rebased, unit-converted and
/// bucketed; the sink only draws.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartData {
    pub title: String,
    pub y_unit: String,
    series: Vec<NamedSeries>,
}

impl ChartData {
    pub fn new(title: impl Into<String>, y_unit: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            y_unit: y_unit.into(),
            series: Vec::new(),
        }
    }

    /// Appends a series. Empty series are dropped so a chart with no data
    /// sources stays empty and is skipped by the caller.
    pub fn add(&mut self, label: impl Into<String>, kind: SeriesKind, series: Series) -> bool {
        if series.is_empty() {
            return false;
        }
        self.series.push(NamedSeries {
            label: label.into(),
            kind,
            series,
        });
        true
    }

    pub fn series(&self) -> &[NamedSeries] {
        &self.series
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Output seam for the external report renderer.
///
/// The core guarantees every chart it emits is non-empty and fully
/// normalized; implementations decide the artifact format (chart images,
/// plain data files). `finish` receives the stems of every artifact emitted
/// for the report directory, in emission order, for index generation.
pub trait ChartSink {
    fn emit(&mut self, chart: &ChartData, stem: &str) -> io::Result<()>;

    fn finish(&mut self, stems: &[String]) -> io::Result<()> {
        let _ = stems;
        Ok(())
    }
}
