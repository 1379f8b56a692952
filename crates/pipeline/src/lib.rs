//! End-to-end sensorgrid pipeline.
//!
//! Orchestrates the stage crates into a single batch run:
//! - load each source into a channel series ([`sensorgrid_ingestion`]);
//! - outer-merge all channels on timestamp;
//! - resample onto the quarter-hour grid ([`sensorgrid_quality`]);
//! - flag quality (inexact matches, stale runs, zero runs);
//! - render canonical output rows and a structured run report.

pub mod output;
pub mod pipeline;
pub mod report;

pub use output::{build_rows, OutputRow};
pub use pipeline::{Pipeline, PipelineOutput, SourceSpec};
pub use report::{ChannelLoadReport, RunReport};
