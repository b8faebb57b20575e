mod report;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use bwe_report_extract::ChartRequest;
use bwe_report_model::RenderConfig;
use clap::{Parser, ValueEnum};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Builds chart-ready series from testbed log directories")]
struct Args {
    /// Chart family to produce.
    #[arg(value_enum, default_value = "all")]
    chart: ChartKind,

    /// One connection's log directory (contains send_log/ and receive_log/).
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Directory artifacts are written to.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Artifact name prefix for single-connection mode.
    #[arg(long, default_value = "run")]
    name: String,

    /// Run start in unix seconds; log timestamps are rebased against it.
    #[arg(long, default_value_t = 0)]
    basetime: i64,

    /// Router capacity log to overlay on rate charts.
    #[arg(long)]
    router: Option<PathBuf>,

    /// Testbed config.json; switches to full-run mode, producing one chart
    /// set per connection listed there.
    #[arg(long)]
    config: Option<PathBuf>,

    /// TOML file overriding chart layout constants.
    #[arg(long)]
    render_config: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ChartKind {
    Rates,
    Gcc,
    Scream,
    Qlog,
    Tcp,
    Latency,
    All,
}

impl From<ChartKind> for ChartRequest {
    fn from(kind: ChartKind) -> Self {
        match kind {
            ChartKind::Rates => ChartRequest::Rates,
            ChartKind::Gcc => ChartRequest::Gcc,
            ChartKind::Scream => ChartRequest::Scream,
            ChartKind::Qlog => ChartRequest::Qlog,
            ChartKind::Tcp => ChartRequest::Tcp,
            ChartKind::Latency => ChartRequest::Latency,
            ChartKind::All => ChartRequest::All,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt::init();
    info!("bwe-report starting...");

    let render = load_render_config(args.render_config.as_deref())?;
    let request = ChartRequest::from(args.chart);

    if let Some(config_path) = &args.config {
        report::run_from_config(config_path, &args.output_dir, request, &render)?;
    } else {
        let Some(input_dir) = &args.input_dir else {
            bail!("either --input-dir or --config is required");
        };
        report::run_single(
            input_dir,
            args.router.as_deref(),
            &args.output_dir,
            &args.name,
            args.basetime * 1_000,
            request,
            &render,
        )?;
    }

    Ok(())
}

fn load_render_config(path: Option<&std::path::Path>) -> Result<RenderConfig> {
    let Some(path) = path else {
        return Ok(RenderConfig::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read render config {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("failed to parse render config {}", path.display()))
}
