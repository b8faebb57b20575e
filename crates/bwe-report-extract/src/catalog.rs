//! The chart catalog: one parameterized pipeline from a report directory to
//! assembled charts.
//!
//! Every builder returns `Ok(None)` (or an empty set) when all of its data
//! sources are missing; the caller skips the chart. A present-but-malformed
//! source aborts the report.

use std::path::PathBuf;

use bwe_report_model::{ChartData, Reducer, RenderConfig, Scale, Series, SeriesKind};
use tracing::{debug, info};

use crate::delimited::{self, layouts};
use crate::error::Result;
use crate::iperf;
use crate::join::join_by_sequence;
use crate::normalize;
use crate::qlog::{self, PacketEvent};

/// Side of the connection a log belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Sender,
    Receiver,
}

impl Side {
    fn log_dir(self) -> &'static str {
        match self {
            Side::Sender => "send_log",
            Side::Receiver => "receive_log",
        }
    }

    fn artifact(self) -> &'static str {
        match self {
            Side::Sender => "sender",
            Side::Receiver => "receiver",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Side::Sender => "Sender",
            Side::Receiver => "Receiver",
        }
    }
}

/// Where a connection's logs live.
#[derive(Debug, Clone)]
pub struct ReportPaths {
    input_dir: PathBuf,
    router_log: Option<PathBuf>,
}

impl ReportPaths {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            router_log: None,
        }
    }

    pub fn with_router(mut self, router_log: impl Into<PathBuf>) -> Self {
        self.router_log = Some(router_log.into());
        self
    }

    fn side_dir(&self, side: Side) -> PathBuf {
        self.input_dir.join(side.log_dir())
    }

    fn side_file(&self, side: Side, name: &str) -> PathBuf {
        self.side_dir(side).join(name)
    }
}

/// Which charts to assemble for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartRequest {
    Rates,
    Gcc,
    Scream,
    Qlog,
    Tcp,
    Latency,
    All,
}

/// Assembles the requested charts as `(artifact_stem, chart)` pairs.
///
/// Charts whose data sources are all missing are silently absent from the
/// result.
pub fn assemble(
    paths: &ReportPaths,
    basetime_ms: i64,
    name: &str,
    request: ChartRequest,
    render: &RenderConfig,
) -> Result<Vec<(String, ChartData)>> {
    let mut charts = Vec::new();

    if matches!(request, ChartRequest::Rates | ChartRequest::All) {
        push(&mut charts, format!("{name}-rtp-rates"), rtp_rates(paths, basetime_ms, name, render)?);
        push(&mut charts, format!("{name}-rtcp-rates"), rtcp_rates(paths, basetime_ms, name)?);
    }
    if matches!(request, ChartRequest::Gcc | ChartRequest::All) {
        charts.extend(gcc_charts(paths, basetime_ms, name)?);
    }
    if matches!(request, ChartRequest::Scream | ChartRequest::All) {
        charts.extend(scream_charts(paths, basetime_ms, name)?);
    }
    if matches!(request, ChartRequest::Qlog | ChartRequest::All) {
        for side in [Side::Sender, Side::Receiver] {
            charts.extend(qlog_charts(paths, side, name)?);
        }
    }
    if matches!(request, ChartRequest::Tcp | ChartRequest::All) {
        push(&mut charts, format!("{name}-tcp"), tcp_rates(paths, basetime_ms, name, render)?);
    }
    if matches!(request, ChartRequest::Latency | ChartRequest::All) {
        charts.extend(latency_charts(paths, basetime_ms, name)?);
    }

    Ok(charts)
}

fn push(charts: &mut Vec<(String, ChartData)>, stem: String, chart: Option<ChartData>) {
    match chart {
        Some(chart) => charts.push((stem, chart)),
        None => info!(stem = %stem, "no data sources, chart skipped"),
    }
}

/// RTP throughput on both sides, the controller's target bitrate, and the
/// shaped link capacity.
fn rtp_rates(
    paths: &ReportPaths,
    basetime_ms: i64,
    name: &str,
    render: &RenderConfig,
) -> Result<Option<ChartData>> {
    let mut chart = ChartData::new(format!("RTP Rates {name}"), "bit/s");

    for (side, file, label) in [
        (Side::Sender, "rtp_out.log", "RTP sent"),
        (Side::Receiver, "rtp_in.log", "RTP received"),
    ] {
        if let Some(records) = delimited::read_records(&paths.side_file(side, file), &layouts::RTP)?
        {
            let series = normalize::normalize(
                normalize::column(&records, "size"),
                basetime_ms,
                Scale::BYTES_TO_BITS,
                Reducer::Sum,
            );
            chart.add(label, SeriesKind::Line, series);
        }
    }

    // The controllers write their target under different file names; a run
    // uses exactly one of them.
    for file in ["gcc.log", "scream.log", "cc.log"] {
        let path = paths.side_file(Side::Sender, file);
        if let Some(records) = delimited::read_records(&path, &layouts::TARGET)? {
            let series = normalize::target(normalize::column(&records, "target"), basetime_ms);
            if chart.add("Target Bitrate", SeriesKind::Line, series) {
                break;
            }
        }
    }

    if chart.is_empty() {
        return Ok(None);
    }
    add_router(&mut chart, paths, basetime_ms, render)?;
    Ok(Some(chart))
}

/// RTCP feedback throughput. The receiver originates feedback, so "sent"
/// comes from its log directory.
fn rtcp_rates(paths: &ReportPaths, basetime_ms: i64, name: &str) -> Result<Option<ChartData>> {
    let mut chart = ChartData::new(format!("RTCP Rates {name}"), "bit/s");

    for (side, file, label) in [
        (Side::Receiver, "rtcp_out.log", "RTCP sent"),
        (Side::Sender, "rtcp_in.log", "RTCP received"),
    ] {
        if let Some(records) =
            delimited::read_records(&paths.side_file(side, file), &layouts::RTCP)?
        {
            let series = normalize::normalize(
                normalize::column(&records, "size"),
                basetime_ms,
                Scale::BYTES_TO_BITS,
                Reducer::Sum,
            );
            chart.add(label, SeriesKind::Line, series);
        }
    }

    Ok((!chart.is_empty()).then_some(chart))
}

/// GCC delay-controller internals: estimate band, RTT and average loss.
fn gcc_charts(
    paths: &ReportPaths,
    basetime_ms: i64,
    name: &str,
) -> Result<Vec<(String, ChartData)>> {
    let path = paths.side_file(Side::Sender, "gcc.log");
    let Some(records) = delimited::read_records(&path, &layouts::GCC)? else {
        debug!(name, "no gcc log, charts skipped");
        return Ok(Vec::new());
    };

    let gauge = |field: &str| normalize::gauge(normalize::column(&records, field), basetime_ms);

    let mut estimate = ChartData::new(format!("GCC Estimate {name}"), "ms");
    estimate.add("Estimate", SeriesKind::Line, gauge("estimate"));
    estimate.add("Threshold", SeriesKind::Line, gauge("threshold"));
    estimate.add("-Threshold", SeriesKind::Line, gauge("threshold").scale(Scale(-1.0)));
    estimate.add("Measurement", SeriesKind::Line, gauge("measurement"));

    let mut rtt = ChartData::new(format!("GCC RTT {name}"), "ms");
    rtt.add("RTT", SeriesKind::Line, gauge("rtt"));

    let mut loss = ChartData::new(format!("GCC Loss {name}"), "ratio");
    loss.add("Average Loss", SeriesKind::Line, gauge("average_loss"));

    let mut charts = Vec::new();
    for (suffix, chart) in [("estimate", estimate), ("rtt", rtt), ("loss", loss)] {
        if !chart.is_empty() {
            charts.push((format!("{name}-gcc-{suffix}"), chart));
        }
    }
    Ok(charts)
}

/// SCReAM controller internals: queue delay, window occupancy and rates.
fn scream_charts(
    paths: &ReportPaths,
    basetime_ms: i64,
    name: &str,
) -> Result<Vec<(String, ChartData)>> {
    let path = paths.side_file(Side::Sender, "scream.log");
    let Some(records) = delimited::read_records(&path, &layouts::SCREAM)? else {
        debug!(name, "no scream log, charts skipped");
        return Ok(Vec::new());
    };

    let gauge = |field: &str| normalize::gauge(normalize::column(&records, field), basetime_ms);

    let mut delay = ChartData::new(format!("Delay {name}"), "s");
    delay.add("Queue Delay", SeriesKind::Line, gauge("queue_delay"));

    let mut in_flight = ChartData::new(format!("Bytes in Flight {name}"), "Byte");
    in_flight.add("CWND", SeriesKind::Line, gauge("cwnd"));
    in_flight.add("Bytes in Flight", SeriesKind::Line, gauge("bytes_in_flight"));

    let mut rates = ChartData::new(format!("Rates {name}"), "kbit/s");
    rates.add("Rate lost", SeriesKind::Line, gauge("rate_lost"));
    rates.add("Rate transmitted", SeriesKind::Line, gauge("rate_transmitted"));
    rates.add("Rate acked", SeriesKind::Line, gauge("rate_acked"));

    let mut charts = Vec::new();
    for (suffix, chart) in [
        ("delay", delay),
        ("in-flight", in_flight),
        ("rates", rates),
    ] {
        if !chart.is_empty() {
            charts.push((format!("{name}-scream-{suffix}"), chart));
        }
    }
    Ok(charts)
}

/// QUIC transport charts from the side's qlog: congestion window, RTT and
/// bytes sent by frame type. qlog timestamps are already run-relative, so no
/// rebase is applied.
fn qlog_charts(paths: &ReportPaths, side: Side, name: &str) -> Result<Vec<(String, ChartData)>> {
    let Some(qlog_path) = qlog::find_qlog(&paths.side_dir(side)) else {
        debug!(name, side = side.artifact(), "no qlog, charts skipped");
        return Ok(Vec::new());
    };

    let mut charts = Vec::new();

    if let Some(metrics) = qlog::read_metrics(&qlog_path)? {
        let mut cwnd = ChartData::new(format!("QLOG {} CWND {name}", side.title()), "Byte");
        cwnd.add(
            "Bytes in Flight",
            SeriesKind::Line,
            Series::from_points(metrics.bytes_in_flight),
        );
        cwnd.add(
            "CWND",
            SeriesKind::Line,
            Series::from_points(metrics.congestion_window),
        );
        if !cwnd.is_empty() {
            charts.push((format!("{name}-qlog-{}-cwnd", side.artifact()), cwnd));
        }

        let mut rtt = ChartData::new(format!("QLOG {} RTT {name}", side.title()), "ms");
        rtt.add(
            "Latest RTT",
            SeriesKind::Line,
            Series::from_points(metrics.latest_rtt),
        );
        if !rtt.is_empty() {
            charts.push((format!("{name}-qlog-{}-rtt", side.artifact()), rtt));
        }
    }

    if let Some(frames) = qlog::read_frame_bytes(&qlog_path, PacketEvent::Sent)? {
        let bucketed = |samples: Vec<(i64, f64)>| {
            normalize::normalize(samples, 0, Scale::BYTES_TO_BITS, Reducer::Sum)
        };
        let mut sent = ChartData::new(format!("QLOG {} Bytes Sent {name}", side.title()), "bit/s");
        sent.add("Datagram Sent", SeriesKind::Line, bucketed(frames.datagram));
        sent.add("Stream Sent", SeriesKind::Line, bucketed(frames.stream));
        sent.add("Total sent", SeriesKind::Line, bucketed(frames.total));
        if !sent.is_empty() {
            charts.push((format!("{name}-qlog-{}-sent", side.artifact()), sent));
        }
    }

    Ok(charts)
}

/// TCP cross-traffic throughput from the iperf interval reports, with link
/// capacity for reference. Interval starts are already run-relative.
fn tcp_rates(
    paths: &ReportPaths,
    basetime_ms: i64,
    name: &str,
    render: &RenderConfig,
) -> Result<Option<ChartData>> {
    let mut chart = ChartData::new(format!("TCP {name}"), "bit/s");

    for (side, label) in [(Side::Sender, "TCP sent"), (Side::Receiver, "TCP received")] {
        if let Some(samples) = iperf::read_intervals(&paths.side_file(side, "tcp.log"))? {
            let series = normalize::normalize(samples, 0, Scale::IDENTITY, Reducer::Mean);
            chart.add(label, SeriesKind::Line, series);
        }
    }

    if chart.is_empty() {
        return Ok(None);
    }
    add_router(&mut chart, paths, basetime_ms, render)?;
    Ok(Some(chart))
}

/// One-way delay and loss rate from joining the sent RTP log with the
/// received one on sequence number. Needs both logs.
fn latency_charts(
    paths: &ReportPaths,
    basetime_ms: i64,
    name: &str,
) -> Result<Vec<(String, ChartData)>> {
    let sent = delimited::read_sequenced(
        &paths.side_file(Side::Sender, "rtp_out.log"),
        &layouts::RTP_SEQUENCED,
    )?;
    let received = delimited::read_sequenced(
        &paths.side_file(Side::Receiver, "rtp_in.log"),
        &layouts::RTP_SEQUENCED,
    )?;
    let (Some(sent), Some(received)) = (sent, received) else {
        debug!(name, "need both rtp logs for the join, charts skipped");
        return Ok(Vec::new());
    };

    let join = join_by_sequence(&sent, &received, basetime_ms);
    if join.is_empty() {
        return Ok(Vec::new());
    }

    let mut charts = Vec::new();

    let mut latency = ChartData::new(format!("RTP One-way Delay {name}"), "ms");
    if latency.add("One-way Delay", SeriesKind::Line, join.latency) {
        charts.push((format!("{name}-rtp-latency"), latency));
    }

    let mut loss = ChartData::new(format!("RTP Loss {name}"), "ratio");
    if loss.add("Loss Rate", SeriesKind::Line, join.loss_rate) {
        charts.push((format!("{name}-rtp-loss"), loss));
    }

    Ok(charts)
}

fn add_router(
    chart: &mut ChartData,
    paths: &ReportPaths,
    basetime_ms: i64,
    render: &RenderConfig,
) -> Result<()> {
    let Some(router_log) = &paths.router_log else {
        return Ok(());
    };
    if let Some(records) = delimited::read_records(router_log, &layouts::ROUTER)? {
        let series = normalize::step(
            normalize::column(&records, "bandwidth"),
            basetime_ms,
            render.window_ms,
        );
        chart.add("Capacity", SeriesKind::Step, series);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn setup_rtp_run(dir: &Path) {
        fs::create_dir_all(dir.join("send_log")).unwrap();
        fs::create_dir_all(dir.join("receive_log")).unwrap();
        fs::write(
            dir.join("send_log/rtp_out.log"),
            "1000, 96, 7, 1, 90000, false, 100\n\
             1100, 96, 7, 2, 90000, false, 100\n\
             1200, 96, 7, 3, 90000, false, 100\n",
        )
        .unwrap();
        fs::write(
            dir.join("receive_log/rtp_in.log"),
            "1050, 96, 7, 1, 90000, false, 100\n\
             1280, 96, 7, 3, 90000, false, 100\n",
        )
        .unwrap();
        fs::write(dir.join("send_log/cc.log"), "1000, 0\n1500, 250000\n").unwrap();
    }

    #[test]
    fn missing_report_directory_produces_no_charts_and_no_error() {
        let dir = TempDir::new().unwrap();
        let paths = ReportPaths::new(dir.path().join("does-not-exist"));
        let charts = assemble(&paths, 0, "run", ChartRequest::All, &RenderConfig::default())
            .unwrap();
        assert!(charts.is_empty());
    }

    #[test]
    fn rtp_rates_chart_assembles_all_available_sources() {
        let dir = TempDir::new().unwrap();
        setup_rtp_run(dir.path());
        fs::write(dir.path().join("router.log"), "1000, 1000000\n").unwrap();

        let paths =
            ReportPaths::new(dir.path()).with_router(dir.path().join("router.log"));
        let render = RenderConfig::default();
        let charts = assemble(&paths, 1_000, "run", ChartRequest::Rates, &render).unwrap();

        assert_eq!(charts.len(), 1);
        let (stem, chart) = &charts[0];
        assert_eq!(stem, "run-rtp-rates");
        let labels: Vec<&str> = chart.series().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["RTP sent", "RTP received", "Target Bitrate", "Capacity"]
        );

        // 3 x 100 bytes in bucket 0 -> 2400 bits.
        assert_eq!(chart.series()[0].series.points(), &[(0, 2_400.0)]);
        // Zero-valued target at t=0 filtered out.
        assert_eq!(chart.series()[2].series.points(), &[(500, 250_000.0)]);
        // Step series extended to the window edge.
        assert_eq!(chart.series()[3].kind, SeriesKind::Step);
        assert_eq!(
            chart.series()[3].series.last_time(),
            Some(render.window_ms)
        );
    }

    #[test]
    fn latency_charts_require_both_logs() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("send_log")).unwrap();
        fs::write(
            dir.path().join("send_log/rtp_out.log"),
            "1000, 96, 7, 1, 90000, false, 100\n",
        )
        .unwrap();

        let paths = ReportPaths::new(dir.path());
        let charts = assemble(
            &paths,
            1_000,
            "run",
            ChartRequest::Latency,
            &RenderConfig::default(),
        )
        .unwrap();
        assert!(charts.is_empty());
    }

    #[test]
    fn latency_and_loss_derived_from_join() {
        let dir = TempDir::new().unwrap();
        setup_rtp_run(dir.path());

        let paths = ReportPaths::new(dir.path());
        let charts = assemble(
            &paths,
            1_000,
            "run",
            ChartRequest::Latency,
            &RenderConfig::default(),
        )
        .unwrap();

        let stems: Vec<&str> = charts.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(stems, vec!["run-rtp-latency", "run-rtp-loss"]);

        let loss = &charts[1].1;
        // Packet 2 of 3 never arrived.
        assert_eq!(loss.series()[0].series.points(), &[(0, 1.0 / 3.0)]);
    }

    #[test]
    fn malformed_log_aborts_the_report() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("send_log")).unwrap();
        fs::write(dir.path().join("send_log/rtp_out.log"), "bogus\n").unwrap();

        let paths = ReportPaths::new(dir.path());
        let result = assemble(
            &paths,
            0,
            "run",
            ChartRequest::Rates,
            &RenderConfig::default(),
        );
        assert!(result.is_err());
    }
}
