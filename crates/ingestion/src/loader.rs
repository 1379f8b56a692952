//! Per-source channel extraction.
//!
//! Turns pre-split records into one channel's `(timestamp, value)`
//! sequence using a `SourceConfig`. Bad rows degrade, never abort: an
//! unnormalizable timestamp drops the row (counted), a non-numeric value
//! cell keeps the row with a missing value (counted) so other channels'
//! values at that instant are not lost downstream.

use crate::timestamp::TimestampNormalizer;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sensorgrid_core::{ChannelSample, ChannelSeries, SourceConfig};

/// Per-channel counters for every drop or substitution during loading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    /// Data rows examined (header rows excluded).
    pub rows_read: u64,
    /// Samples emitted (with or without a value).
    pub samples: u64,
    /// Samples carrying an actual numeric value.
    pub values: u64,
    /// Rows dropped because the timestamp matched no supported pattern.
    pub unparseable_timestamps: u64,
    /// Value cells that were not numeric (kept as missing).
    pub non_numeric_values: u64,
    /// Rows dropped because the time column was absent.
    pub missing_time_column: u64,
}

impl LoadStats {
    /// Rows dropped outright (timestamp or time column problems).
    pub fn dropped_rows(&self) -> u64 {
        self.unparseable_timestamps + self.missing_time_column
    }

    /// Whether the channel yielded zero usable values.
    pub fn is_empty_channel(&self) -> bool {
        self.values == 0
    }
}

/// Extracts one channel's ordered sample sequence from raw records.
pub struct SeriesLoader {
    normalizer: TimestampNormalizer,
}

impl SeriesLoader {
    /// Create a loader whose timestamps resolve in the given zone.
    pub fn new(zone: Tz) -> Self {
        Self {
            normalizer: TimestampNormalizer::new(zone),
        }
    }

    /// Extract the channel configured by `config` from `records`.
    ///
    /// Records up to and including `header_row_index` are skipped; the
    /// rest are data rows. The returned series preserves source order.
    pub fn load(&self, config: &SourceConfig, records: &[Vec<String>]) -> (ChannelSeries, LoadStats) {
        let mut series = ChannelSeries::empty(&config.channel_name);
        let mut stats = LoadStats::default();

        for record in records.iter().skip(config.header_row_index + 1) {
            stats.rows_read += 1;

            let Some(time_cell) = record.get(config.time_column) else {
                stats.missing_time_column += 1;
                continue;
            };

            let timestamp = match self.normalizer.normalize(time_cell) {
                Ok(t) => t,
                Err(_) => {
                    stats.unparseable_timestamps += 1;
                    tracing::debug!(
                        channel = %config.channel_name,
                        raw = %time_cell,
                        "dropping row with unparseable timestamp"
                    );
                    continue;
                }
            };

            let value = record
                .get(config.value_column)
                .and_then(|cell| parse_value(cell));
            match value {
                Some(_) => stats.values += 1,
                None => stats.non_numeric_values += 1,
            }

            stats.samples += 1;
            series.samples.push(ChannelSample { timestamp, value });
        }

        (series, stats)
    }
}

/// Parse a value cell; `None` for anything non-numeric (including empty
/// and text states like "off"). Zero is preserved as zero.
fn parse_value(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Split raw text lines into records on a delimiter, for callers that
/// have not pre-split their rows. Cells keep interior whitespace; a
/// trailing carriage return is stripped.
pub fn split_records(lines: &[&str], delimiter: char) -> Vec<Vec<String>> {
    lines
        .iter()
        .map(|line| {
            line.trim_end_matches('\r')
                .split(delimiter)
                .map(str::to_string)
                .collect()
        })
        .collect()
}
