use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use bwe_report_extract::{ChartRequest, ReportPaths, assemble};
use bwe_report_model::{ChartData, ChartSink, RenderConfig, RunConfig, SeriesKind};
use tracing::info;

/// Writes each chart's series to a `<stem>.csv` data file, one row per
/// point, plus an `index.txt` enumerating the artifacts of the directory.
/// Image rendering and HTML generation live outside this tool.
pub struct CsvChartSink {
    out_dir: std::path::PathBuf,
}

impl CsvChartSink {
    pub fn new(out_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }
}

impl ChartSink for CsvChartSink {
    fn emit(&mut self, chart: &ChartData, stem: &str) -> io::Result<()> {
        let path = self.out_dir.join(format!("{stem}.csv"));
        let mut writer = csv::Writer::from_path(&path).map_err(io::Error::other)?;
        writer
            .write_record(["series", "kind", "time_ms", "value"])
            .map_err(io::Error::other)?;
        for named in chart.series() {
            let kind = match named.kind {
                SeriesKind::Line => "line",
                SeriesKind::Step => "step",
            };
            for &(time_ms, value) in named.series.points() {
                writer
                    .serialize((&named.label, kind, time_ms, value))
                    .map_err(io::Error::other)?;
            }
        }
        writer.flush()
    }

    fn finish(&mut self, stems: &[String]) -> io::Result<()> {
        if stems.is_empty() {
            return Ok(());
        }
        let listing: String = stems
            .iter()
            .map(|stem| format!("{stem}.csv\n"))
            .collect();
        fs::write(self.out_dir.join("index.txt"), listing)
    }
}

/// Builds the requested charts for one connection directory.
///
/// Missing data sources mean skipped charts, never errors; a chart set that
/// comes out empty leaves the output directory untouched.
pub fn run_single(
    input_dir: &Path,
    router: Option<&Path>,
    output_dir: &Path,
    name: &str,
    basetime_ms: i64,
    request: ChartRequest,
    render: &RenderConfig,
) -> Result<usize> {
    let mut paths = ReportPaths::new(input_dir);
    if let Some(router) = router {
        paths = paths.with_router(router);
    }

    let charts = assemble(&paths, basetime_ms, name, request, render)
        .with_context(|| format!("failed to extract series from {}", input_dir.display()))?;
    if charts.is_empty() {
        info!(name, "nothing to report");
        return Ok(0);
    }

    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let mut sink = CsvChartSink::new(output_dir);
    emit_all(&mut sink, &charts)?;

    info!(name, charts = charts.len(), "report written");
    Ok(charts.len())
}

/// Full-run mode: one chart set per connection listed in the testbed's
/// `config.json`, laid out as `<output>/<run-id>/<implementation>/<scenario>/`.
pub fn run_from_config(
    config_path: &Path,
    output_dir: &Path,
    request: ChartRequest,
    render: &RenderConfig,
) -> Result<()> {
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let config: RunConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;

    // Logs live next to config.json, one directory per connection.
    let input_root = config_path.parent().unwrap_or(Path::new("."));

    for connection in &config.connections {
        let detail_dir = output_dir
            .join(config.run_id())
            .join(&connection.implementation)
            .join(&config.scenario.name);

        run_single(
            &input_root.join(&connection.name),
            Some(&input_root.join(&connection.router)),
            &detail_dir,
            &connection.name,
            config.basetime_ms(),
            request,
            render,
        )?;
    }

    Ok(())
}

fn emit_all(sink: &mut dyn ChartSink, charts: &[(String, ChartData)]) -> Result<()> {
    let mut stems = Vec::with_capacity(charts.len());
    for (stem, chart) in charts {
        sink.emit(chart, stem)
            .with_context(|| format!("failed to write chart {stem}"))?;
        stems.push(stem.clone());
    }
    sink.finish(&stems).context("failed to write report index")
}
