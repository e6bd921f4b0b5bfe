//! Per-endpoint latency statistics over large fixed-format access logs.
//!
//! The file is split into line-aligned parts, each part is streamed and
//! tokenized by its own worker into a local stats map, and the local maps are
//! merged and rendered as a sorted JSON report.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod intern;
pub mod logging;
pub mod planner;
pub mod profile;
pub mod report;
pub mod stats;
pub mod tokenizer;
pub mod worker;

pub use analyzer::{analyze, Analysis};
pub use config::{Config, ProfileSettings};
pub use error::{AnalyzeError, RecordError};
pub use planner::Part;
pub use stats::{Stats, StatsMap};
