//! Configuration structures for the sensorgrid system.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Default display/interpretation zone when a source specifies none.
pub const DEFAULT_ZONE: Tz = chrono_tz::America::New_York;

/// Per-source extraction configuration.
///
/// Produced by an upstream column-detection collaborator (manual or
/// AI-assisted); the core only consumes the resolved record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Row index (0-based) holding column headers; data starts at the next row.
    pub header_row_index: usize,
    /// Field delimiter for callers holding unsplit text lines.
    pub delimiter: char,
    /// Column index (0-based) of the timestamp cell.
    pub time_column: usize,
    /// Column index (0-based) of the value cell.
    pub value_column: usize,
    /// Channel name for this source's series.
    pub channel_name: String,
    /// IANA zone id (e.g. "America/New_York"); `None` falls back to the
    /// pipeline default.
    pub zone_id: Option<String>,
}

impl SourceConfig {
    /// Resolve this source's zone, falling back to `default` when unset.
    ///
    /// # Errors
    /// Returns `Error::UnknownZone` when `zone_id` is set but not a valid
    /// IANA zone name.
    pub fn resolve_zone(&self, default: Tz) -> crate::Result<Tz> {
        match self.zone_id.as_deref() {
            None => Ok(default),
            Some(id) => id
                .parse::<Tz>()
                .map_err(|_| crate::Error::UnknownZone(id.to_string())),
        }
    }
}

/// Knobs for the resample/flag stages, exposed to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum distance (minutes) between a grid slot and a raw sample
    /// for it to count as a match.
    pub tolerance_minutes: i64,
    /// Consecutive identical non-zero values before the stale flag fires.
    pub stale_run_length: u32,
    /// Grid step in minutes (fixed at 15 for this domain, parameterized
    /// for testability).
    pub step_minutes: i64,
    /// Zone applied to sources without an explicit `zone_id`.
    pub default_zone: Tz,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tolerance_minutes: 2,
            stale_run_length: 4,
            step_minutes: 15,
            default_zone: DEFAULT_ZONE,
        }
    }
}
