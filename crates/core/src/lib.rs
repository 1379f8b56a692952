//! Core types and configuration for the sensorgrid system.
//!
//! This crate provides shared types used across all other crates:
//! - Time and sample types (time points, channel series, merged/resampled tables)
//! - Quality flag types (match kinds, zero states, flag sets)
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{PipelineConfig, SourceConfig};
pub use error::{Error, Result};
pub use types::*;
