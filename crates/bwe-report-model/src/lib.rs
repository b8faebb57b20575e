pub mod chart;
pub mod config;
pub mod record;
pub mod series;

pub use chart::{ChartData, ChartSink, NamedSeries, SeriesKind};
pub use config::{Connection, RenderConfig, RunConfig};
pub use record::{SequencedRecord, TimestampedRecord};
pub use series::{BUCKET_MS, Reducer, Scale, Series};
