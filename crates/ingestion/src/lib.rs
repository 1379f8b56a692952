//! Data ingestion and normalization for the sensorgrid system.
//!
//! This crate handles:
//! - Heterogeneous timestamp normalization (fixed pattern priority, zone
//!   abbreviation overrides)
//! - Per-source channel extraction from pre-split records
//! - Outer-alignment merge of all channels into one wide table

pub mod loader;
pub mod merge;
pub mod timestamp;

pub use loader::{split_records, LoadStats, SeriesLoader};
pub use merge::merge;
pub use timestamp::TimestampNormalizer;
