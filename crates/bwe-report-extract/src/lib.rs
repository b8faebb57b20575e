pub mod catalog;
pub mod delimited;
pub mod error;
pub mod iperf;
pub mod join;
pub mod normalize;
pub mod qlog;

pub use catalog::{ChartRequest, ReportPaths, Side, assemble};
pub use error::{ExtractError, Result};
pub use join::{SequenceJoin, join_by_sequence};
