//! Quarter-hour grid resampling with per-channel nearest matching.
//!
//! Builds the canonical grid spanning the merged data's time extent and,
//! independently per channel, selects the nearest raw sample within a
//! bounded tolerance window. Channels log asynchronously at different
//! base rates, so one channel's availability never influences another's
//! match.

use serde::{Deserialize, Serialize};
use sensorgrid_core::{
    Error, MatchKind, MergedTable, ResampledCell, ResampledTable, Result, TimePoint,
};

/// Cell-level counters for one resample pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResampleStats {
    /// Grid slots produced.
    pub total_slots: u64,
    /// Cells whose source timestamp equals the slot.
    pub exact_cells: u64,
    /// Cells matched within tolerance but off the slot.
    pub inexact_cells: u64,
    /// Cells with no candidate within tolerance.
    pub absent_cells: u64,
}

/// Resamples a merged table onto a fixed-step grid.
#[derive(Debug, Clone, Copy)]
pub struct QuarterHourResampler {
    tolerance_minutes: i64,
    step_minutes: i64,
}

impl QuarterHourResampler {
    /// Create a resampler with the given tolerance window and grid step.
    ///
    /// # Errors
    /// Returns `Error::Config` for a non-positive step or a negative
    /// tolerance; the grid arithmetic cannot operate on either.
    pub fn new(tolerance_minutes: i64, step_minutes: i64) -> Result<Self> {
        if step_minutes <= 0 {
            return Err(Error::config(format!(
                "step_minutes must be positive, got {step_minutes}"
            )));
        }
        if tolerance_minutes < 0 {
            return Err(Error::config(format!(
                "tolerance_minutes must be non-negative, got {tolerance_minutes}"
            )));
        }
        Ok(Self {
            tolerance_minutes,
            step_minutes,
        })
    }

    /// Resample `merged` onto the grid.
    ///
    /// The grid runs from `floor_to_step(first timestamp)` to
    /// `ceil_to_step(last timestamp)` inclusive. An empty merged table
    /// yields an empty grid, not an error.
    pub fn resample(&self, merged: &MergedTable) -> (ResampledTable, ResampleStats) {
        let mut stats = ResampleStats::default();

        let Some((start, end)) = merged.time_span() else {
            return (
                ResampledTable {
                    channels: merged.channels.clone(),
                    step_minutes: self.step_minutes,
                    slots: Vec::new(),
                    cells: Vec::new(),
                },
                stats,
            );
        };

        let slots = build_grid(start, end, self.step_minutes);
        stats.total_slots = slots.len() as u64;

        let mut cells = vec![vec![ResampledCell::absent(); merged.channels.len()]; slots.len()];
        let tolerance_secs = self.tolerance_minutes * 60;

        for channel_idx in 0..merged.channels.len() {
            // Candidates are this channel's non-missing samples, already
            // time-sorted by the merge.
            let samples: Vec<(TimePoint, f64)> = merged
                .rows
                .iter()
                .filter_map(|row| row.values[channel_idx].map(|v| (row.timestamp, v)))
                .collect();
            if samples.is_empty() {
                continue;
            }

            // Pointer-advance nearest scan: slots ascend, so the nearest
            // sample index never regresses. Advancing only on a strictly
            // smaller distance keeps the earlier sample on an exact tie.
            let mut idx = 0;
            for (slot_idx, slot) in slots.iter().enumerate() {
                while idx + 1 < samples.len()
                    && samples[idx + 1].0.distance_seconds(slot)
                        < samples[idx].0.distance_seconds(slot)
                {
                    idx += 1;
                }
                let (source, value) = samples[idx];
                if source.distance_seconds(slot) > tolerance_secs {
                    continue;
                }
                let kind = if source == *slot {
                    MatchKind::Exact
                } else {
                    MatchKind::Inexact
                };
                cells[slot_idx][channel_idx] = ResampledCell {
                    value: Some(value),
                    source: Some(source),
                    kind,
                };
            }
        }

        for row in &cells {
            for cell in row {
                match cell.kind {
                    MatchKind::Exact => stats.exact_cells += 1,
                    MatchKind::Inexact => stats.inexact_cells += 1,
                    MatchKind::Absent => stats.absent_cells += 1,
                }
            }
        }

        (
            ResampledTable {
                channels: merged.channels.clone(),
                step_minutes: self.step_minutes,
                slots,
                cells,
            },
            stats,
        )
    }
}

/// Contiguous grid from the floored start to the ceiled end, inclusive.
fn build_grid(start: TimePoint, end: TimePoint, step_minutes: i64) -> Vec<TimePoint> {
    let first = start.floor_to_step(step_minutes);
    let last = end.ceil_to_step(step_minutes);
    let mut slots = Vec::new();
    let mut cursor = first;
    while cursor <= last {
        slots.push(cursor);
        cursor = cursor.plus_minutes(step_minutes);
    }
    slots
}
