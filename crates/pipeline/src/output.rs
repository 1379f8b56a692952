//! Canonical output rows.
//!
//! The export-facing shape of the final table: one row per grid slot,
//! timestamps rendered in the canonical `MM/DD/YYYY HH:MM:SS` display
//! format, with that slot's quality annotations attached.

use sensorgrid_core::{FlagSet, ResampledTable, ZeroState};
use serde::{Deserialize, Serialize};

/// One quality-annotated row of the final quarter-hour table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    /// Slot timestamp in canonical display format, in the slot's zone.
    pub timestamp: String,
    /// One optional value per channel, in channel order.
    pub values: Vec<Option<f64>>,
    /// True if any channel matched this slot inexactly.
    pub inexact: bool,
    /// Channels inside a stale run at this slot.
    pub stale_channels: Vec<String>,
    /// Zero-run summary across channels at this slot.
    pub zero_state: ZeroState,
}

/// Join the resampled grid with its per-slot flags into output rows.
///
/// `flags` must be the flag sequence computed from `resampled`; they are
/// parallel by construction.
pub fn build_rows(resampled: &ResampledTable, flags: &[FlagSet]) -> Vec<OutputRow> {
    debug_assert_eq!(resampled.len(), flags.len());
    resampled
        .slots
        .iter()
        .zip(&resampled.cells)
        .zip(flags)
        .map(|((slot, cells), flag)| OutputRow {
            timestamp: slot.to_mdy_hms(),
            values: cells.iter().map(|cell| cell.value).collect(),
            inexact: flag.inexact,
            stale_channels: flag.stale_channels.clone(),
            zero_state: flag.zero_state,
        })
        .collect()
}
