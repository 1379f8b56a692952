//! Grid resampling and quality flagging for the sensorgrid system.
//!
//! This crate handles:
//! - Quarter-hour grid construction over the merged time extent
//! - Per-channel nearest-within-tolerance matching (exact/inexact/absent)
//! - Sequential stale-run and zero-run flagging across grid slots

pub mod flags;
pub mod resample;

pub use flags::{FlagStats, QualityFlagger};
pub use resample::{QuarterHourResampler, ResampleStats};
