//! Outer-alignment merge of channel series into one wide table.
//!
//! Builds the union of all distinct time points across channels, one
//! column per channel, `None` where a channel has no sample. Sort-merge
//! throughout: O(n log n) in total sample count.

use sensorgrid_core::{ChannelSeries, MergedRow, MergedTable};

/// Merge N channel series into a timestamp-sorted wide table.
///
/// Rows exist only at instants where at least one channel had a raw
/// sample. Samples of the *same* channel at the same instant collapse
/// last-row-wins (a no-op for true duplicates, guarding against a
/// channel loaded twice); different channels at the same instant keep
/// their own columns.
pub fn merge(series: Vec<ChannelSeries>) -> MergedTable {
    let channels: Vec<String> = series.iter().map(|s| s.name.clone()).collect();

    // Stable per-channel sort keeps source order among equal timestamps,
    // so the later duplicate wins when filling columns below.
    let columns: Vec<Vec<sensorgrid_core::ChannelSample>> = series
        .into_iter()
        .map(|s| {
            let mut samples = s.samples;
            samples.sort_by_key(|x| x.timestamp);
            samples
        })
        .collect();

    let mut stamps: Vec<sensorgrid_core::TimePoint> = columns
        .iter()
        .flatten()
        .map(|sample| sample.timestamp)
        .collect();
    stamps.sort_unstable();
    stamps.dedup();

    let mut rows: Vec<MergedRow> = stamps
        .into_iter()
        .map(|timestamp| MergedRow {
            timestamp,
            values: vec![None; channels.len()],
        })
        .collect();

    // Pointer-advance fill: every sample timestamp is present in the
    // union, so each sample lands on an exact row hit.
    for (channel_idx, column) in columns.iter().enumerate() {
        let mut row_idx = 0;
        for sample in column {
            while rows[row_idx].timestamp < sample.timestamp {
                row_idx += 1;
            }
            rows[row_idx].values[channel_idx] = sample.value;
        }
    }

    MergedTable { channels, rows }
}
