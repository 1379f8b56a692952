//! Core data types for the sensorgrid system.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Sensor reading value with total ordering and exact equality.
pub type Reading = OrderedFloat<f64>;

/// Canonical display format for timestamps: `MM/DD/YYYY HH:MM:SS`, 24-hour.
pub const CANONICAL_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// An absolute instant, UTC-backed, carrying the zone used for display.
///
/// Two `TimePoint`s compare equal iff they represent the same instant,
/// regardless of the zone they were constructed with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimePoint {
    instant: DateTime<Utc>,
    zone: Tz,
}

impl TimePoint {
    /// Create a time point from a UTC instant and a display zone.
    pub fn new(instant: DateTime<Utc>, zone: Tz) -> Self {
        Self { instant, zone }
    }

    /// The underlying UTC instant.
    #[inline]
    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    /// The zone used for display formatting.
    #[inline]
    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Seconds since the Unix epoch.
    #[inline]
    pub fn epoch_seconds(&self) -> i64 {
        self.instant.timestamp()
    }

    /// Absolute distance to another time point, in seconds.
    #[inline]
    pub fn distance_seconds(&self, other: &TimePoint) -> i64 {
        (self.epoch_seconds() - other.epoch_seconds()).abs()
    }

    /// Floor to the previous grid boundary (epoch-aligned).
    ///
    /// Every real-world UTC offset is a multiple of 15 minutes, so
    /// epoch-aligned quarter-hour boundaries land on local :00/:15/:30/:45
    /// in any display zone.
    pub fn floor_to_step(&self, step_minutes: i64) -> TimePoint {
        let step = step_minutes * 60;
        let rem = self.instant.timestamp().rem_euclid(step);
        TimePoint {
            instant: self.instant - Duration::seconds(rem),
            zone: self.zone,
        }
    }

    /// Ceil to the next grid boundary; an exact boundary maps to itself.
    pub fn ceil_to_step(&self, step_minutes: i64) -> TimePoint {
        let step = step_minutes * 60;
        let rem = self.instant.timestamp().rem_euclid(step);
        if rem == 0 {
            *self
        } else {
            TimePoint {
                instant: self.instant + Duration::seconds(step - rem),
                zone: self.zone,
            }
        }
    }

    /// Advance by a number of whole minutes.
    pub fn plus_minutes(&self, minutes: i64) -> TimePoint {
        TimePoint {
            instant: self.instant + Duration::minutes(minutes),
            zone: self.zone,
        }
    }

    /// Render in the canonical `MM/DD/YYYY HH:MM:SS` display format,
    /// expressed in this point's display zone. Lossless: re-normalizing
    /// the output with the same zone yields the same instant.
    pub fn to_mdy_hms(&self) -> String {
        self.instant
            .with_timezone(&self.zone)
            .format(CANONICAL_FORMAT)
            .to_string()
    }
}

impl PartialEq for TimePoint {
    fn eq(&self, other: &Self) -> bool {
        self.instant == other.instant
    }
}

impl Eq for TimePoint {}

impl PartialOrd for TimePoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimePoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant.cmp(&other.instant)
    }
}

impl Hash for TimePoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.instant.hash(state);
    }
}

/// A single raw observation for one channel.
///
/// `value` is `None` when the source cell was non-numeric; the timestamp
/// still participates in the merge so other channels' values at the same
/// instant are not lost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelSample {
    /// Normalized observation instant.
    pub timestamp: TimePoint,
    /// Observed value, or `None` for a non-numeric cell.
    pub value: Option<f64>,
}

/// One logical sensor's time series, uniquely named within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSeries {
    /// Channel name (user- or metadata-derived, collisions resolved upstream).
    pub name: String,
    /// Samples in source order; the merger sorts them.
    pub samples: Vec<ChannelSample>,
}

impl ChannelSeries {
    /// Create an empty series for a channel (all-missing column).
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            samples: Vec::new(),
        }
    }

    /// Number of samples carrying an actual value.
    pub fn value_count(&self) -> usize {
        self.samples.iter().filter(|s| s.value.is_some()).count()
    }
}

/// One row of the merged wide table, keyed by a single time point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRow {
    /// Row instant (unique within the table).
    pub timestamp: TimePoint,
    /// One optional value per channel, parallel to `MergedTable::channels`.
    pub values: Vec<Option<f64>>,
}

/// Timestamp-sorted outer alignment of all channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedTable {
    /// Channel names, defining the column order of every row.
    pub channels: Vec<String>,
    /// Rows strictly ascending by timestamp, no duplicates.
    pub rows: Vec<MergedRow>,
}

impl MergedTable {
    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First and last row timestamps, if any rows exist.
    pub fn time_span(&self) -> Option<(TimePoint, TimePoint)> {
        match (self.rows.first(), self.rows.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
            _ => None,
        }
    }
}

/// How a resampled cell was matched to its grid slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    /// The raw sample's timestamp equals the slot exactly.
    Exact,
    /// A sample was found within tolerance but off the slot.
    Inexact,
    /// No sample within tolerance; the cell is missing.
    Absent,
}

/// Per-(slot, channel) result of resampling. Immutable once computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResampledCell {
    /// Matched value, or `None` when absent.
    pub value: Option<f64>,
    /// Timestamp of the matched raw sample, or `None` when absent.
    pub source: Option<TimePoint>,
    /// Match classification.
    pub kind: MatchKind,
}

impl ResampledCell {
    /// An absent cell (no candidate within tolerance).
    pub fn absent() -> Self {
        Self {
            value: None,
            source: None,
            kind: MatchKind::Absent,
        }
    }
}

/// The quarter-hour grid with per-channel matched cells.
///
/// `cells` is row-major: `cells[slot_index][channel_index]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResampledTable {
    /// Channel names, defining the column order of every `cells` row.
    pub channels: Vec<String>,
    /// Grid step in minutes (15 for this domain, parameterized for tests).
    pub step_minutes: i64,
    /// Contiguous grid slots, ascending, no gaps or duplicates.
    pub slots: Vec<TimePoint>,
    /// One cell per (slot, channel).
    pub cells: Vec<Vec<ResampledCell>>,
}

impl ResampledTable {
    /// Number of grid slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the grid is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Cell for a (slot, channel) pair.
    #[inline]
    pub fn cell(&self, slot: usize, channel: usize) -> &ResampledCell {
        &self.cells[slot][channel]
    }
}

/// Slot-level summary of zero-value runs across all channels.
///
/// Ordering encodes precedence: `Repeated` > `Single` > `Clear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ZeroState {
    /// No channel's current value is zero.
    Clear,
    /// At least one channel has an isolated zero.
    Single,
    /// At least one channel has two or more consecutive zeros ending here.
    Repeated,
}

/// Quality annotations for one grid slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagSet {
    /// The annotated slot.
    pub timestamp: TimePoint,
    /// True if any channel's cell at this slot matched inexactly.
    pub inexact: bool,
    /// Channels currently inside a stale run, in channel order.
    pub stale_channels: Vec<String>,
    /// Zero-run summary across all channels.
    pub zero_state: ZeroState,
}
