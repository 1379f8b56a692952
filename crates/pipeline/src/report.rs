//! Structured run report.
//!
//! Every drop, substitution, and degradation in a run is accounted for
//! here; a run never silently succeeds with less data than it was given.

use sensorgrid_ingestion::LoadStats;
use sensorgrid_quality::{FlagStats, ResampleStats};
use serde::{Deserialize, Serialize};

/// Load outcome for one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLoadReport {
    /// Final (collision-suffixed) channel name.
    pub channel: String,
    /// Row-level drop/substitution counters from loading.
    pub stats: LoadStats,
    /// Source-level failure that degraded this channel to all-missing,
    /// if one occurred (e.g. an unknown zone id).
    pub error: Option<String>,
}

impl ChannelLoadReport {
    /// Whether the channel was degraded or yielded no usable values.
    pub fn is_empty(&self) -> bool {
        self.error.is_some() || self.stats.is_empty_channel()
    }
}

/// Full accounting for one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// One entry per source, in source order.
    pub channels: Vec<ChannelLoadReport>,
    /// Channels that contributed no values (degraded or all-dropped),
    /// retained in the output schema as all-missing columns.
    pub empty_channels: Vec<String>,
    /// Grid/match counters from resampling.
    pub resample: ResampleStats,
    /// Quality-flag counters.
    pub flags: FlagStats,
}

impl RunReport {
    /// Total rows dropped across all channels during loading.
    pub fn dropped_rows(&self) -> u64 {
        self.channels.iter().map(|c| c.stats.dropped_rows()).sum()
    }
}
