//! Sequential quality flagging over the resampled grid.
//!
//! The one stage with true sequential dependency: a single forward fold
//! over slots carries per-channel run state (stale runs, zero runs).
//! Channels stay independent of each other; only the slot-level
//! aggregates (inexact flag, stale set, zero state) combine them.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use sensorgrid_core::{FlagSet, MatchKind, Reading, ResampledTable, ZeroState};
use std::collections::HashMap;

/// Flag counters for one flagging pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagStats {
    /// Slots where any channel matched inexactly.
    pub inexact_rows: u64,
    /// Slots with at least one stale channel.
    pub rows_with_stale: u64,
    /// Stale-slot count per channel.
    pub stale_by_channel: HashMap<String, u64>,
    /// Slots per zero state.
    pub zero_clear: u64,
    pub zero_single: u64,
    pub zero_repeated: u64,
}

/// Per-channel run state carried across slots.
#[derive(Debug, Clone, Copy, Default)]
struct RunState {
    /// Value of the current identical-non-zero run, if any.
    run_value: Option<Reading>,
    /// Length of the current identical-non-zero run.
    run_len: u32,
    /// Consecutive zeros ending at the current slot.
    zero_run: u32,
}

impl RunState {
    fn observe(&mut self, value: Option<f64>) {
        match value {
            // A resampling hole breaks every run; a new run must restart
            // after the gap to avoid false positives.
            None => *self = RunState::default(),
            Some(v) if v == 0.0 => {
                self.zero_run += 1;
                // Zeros are excluded from stale consideration entirely;
                // they are reported through ZeroState instead.
                self.run_value = None;
                self.run_len = 0;
            }
            Some(v) => {
                self.zero_run = 0;
                let reading = OrderedFloat(v);
                if self.run_value == Some(reading) {
                    self.run_len += 1;
                } else {
                    self.run_value = Some(reading);
                    self.run_len = 1;
                }
            }
        }
    }
}

/// Computes per-slot quality annotations from resampled cells.
#[derive(Debug, Clone, Copy)]
pub struct QualityFlagger {
    stale_run_length: u32,
}

impl QualityFlagger {
    /// Create a flagger; the stale flag fires on the
    /// `stale_run_length`-th consecutive identical non-zero value.
    pub fn new(stale_run_length: u32) -> Self {
        Self { stale_run_length }
    }

    /// Fold over the grid in ascending slot order, producing one
    /// [`FlagSet`] per slot.
    pub fn flag(&self, resampled: &ResampledTable) -> (Vec<FlagSet>, FlagStats) {
        let mut stats = FlagStats::default();
        let mut states = vec![RunState::default(); resampled.channels.len()];
        let mut flags = Vec::with_capacity(resampled.len());

        for (slot_idx, slot) in resampled.slots.iter().enumerate() {
            let row = &resampled.cells[slot_idx];

            // Absent cells contribute no value and are not inexact.
            let inexact = row.iter().any(|cell| cell.kind == MatchKind::Inexact);

            let mut stale_channels = Vec::new();
            let mut zero_state = ZeroState::Clear;

            for (channel_idx, cell) in row.iter().enumerate() {
                let state = &mut states[channel_idx];
                state.observe(cell.value);

                if self.stale_run_length > 0 && state.run_len >= self.stale_run_length {
                    let name = &resampled.channels[channel_idx];
                    stale_channels.push(name.clone());
                    *stats.stale_by_channel.entry(name.clone()).or_insert(0) += 1;
                }

                zero_state = zero_state.max(match state.zero_run {
                    0 => ZeroState::Clear,
                    1 => ZeroState::Single,
                    _ => ZeroState::Repeated,
                });
            }

            if inexact {
                stats.inexact_rows += 1;
            }
            if !stale_channels.is_empty() {
                stats.rows_with_stale += 1;
            }
            match zero_state {
                ZeroState::Clear => stats.zero_clear += 1,
                ZeroState::Single => stats.zero_single += 1,
                ZeroState::Repeated => stats.zero_repeated += 1,
            }

            flags.push(FlagSet {
                timestamp: *slot,
                inexact,
                stale_channels,
                zero_state,
            });
        }

        (flags, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sensorgrid_core::{ResampledCell, TimePoint};

    /// Build a resampled table directly from per-channel value columns,
    /// one slot per entry, all matches exact.
    fn table(channels: &[&str], columns: &[Vec<Option<f64>>]) -> ResampledTable {
        let len = columns.first().map_or(0, Vec::len);
        let slots: Vec<TimePoint> = (0..len)
            .map(|i| {
                TimePoint::new(
                    Utc.with_ymd_and_hms(2024, 7, 18, 12, 0, 0).unwrap()
                        + chrono::Duration::minutes(15 * i as i64),
                    chrono_tz::UTC,
                )
            })
            .collect();
        let cells = (0..len)
            .map(|slot_idx| {
                columns
                    .iter()
                    .map(|col| match col[slot_idx] {
                        Some(v) => ResampledCell {
                            value: Some(v),
                            source: Some(slots[slot_idx]),
                            kind: MatchKind::Exact,
                        },
                        None => ResampledCell::absent(),
                    })
                    .collect()
            })
            .collect();
        ResampledTable {
            channels: channels.iter().map(|c| c.to_string()).collect(),
            step_minutes: 15,
            slots,
            cells,
        }
    }

    fn stale_flags(flags: &[FlagSet], channel: &str) -> Vec<bool> {
        flags
            .iter()
            .map(|f| f.stale_channels.iter().any(|c| c == channel))
            .collect()
    }

    #[test]
    fn test_stale_fires_on_nth_identical_value() {
        let t = table(
            &["a"],
            &[vec![
                Some(100.0),
                Some(100.0),
                Some(100.0),
                Some(100.0),
                Some(100.0),
                Some(105.0),
            ]],
        );
        let (flags, stats) = QualityFlagger::new(4).flag(&t);

        assert_eq!(
            stale_flags(&flags, "a"),
            vec![false, false, false, true, true, false]
        );
        assert_eq!(stats.stale_by_channel["a"], 2);
        assert_eq!(stats.rows_with_stale, 2);
    }

    #[test]
    fn test_stale_run_length_three() {
        // [10,10,10] flags starting at the 3rd occurrence
        let t = table(&["a"], &[vec![Some(10.0), Some(10.0), Some(10.0)]]);
        let (flags, _) = QualityFlagger::new(3).flag(&t);

        assert_eq!(stale_flags(&flags, "a"), vec![false, false, true]);
    }

    #[test]
    fn test_missing_value_resets_stale_run() {
        let t = table(
            &["a"],
            &[vec![
                Some(7.0),
                Some(7.0),
                None,
                Some(7.0),
                Some(7.0),
                Some(7.0),
            ]],
        );
        let (flags, _) = QualityFlagger::new(3).flag(&t);

        // The gap restarts the run: flag only on the 3rd value after it
        assert_eq!(
            stale_flags(&flags, "a"),
            vec![false, false, false, false, false, true]
        );
    }

    #[test]
    fn test_zero_values_never_stale() {
        let t = table(
            &["a"],
            &[vec![Some(0.0), Some(0.0), Some(0.0), Some(0.0)]],
        );
        let (flags, stats) = QualityFlagger::new(3).flag(&t);

        assert!(flags.iter().all(|f| f.stale_channels.is_empty()));
        assert!(stats.stale_by_channel.is_empty());
        // Reported through the zero state instead
        assert_eq!(flags[3].zero_state, ZeroState::Repeated);
    }

    #[test]
    fn test_zero_interrupts_stale_run() {
        let t = table(
            &["a"],
            &[vec![Some(5.0), Some(5.0), Some(0.0), Some(5.0), Some(5.0), Some(5.0)]],
        );
        let (flags, _) = QualityFlagger::new(3).flag(&t);

        assert_eq!(
            stale_flags(&flags, "a"),
            vec![false, false, false, false, false, true]
        );
    }

    #[test]
    fn test_zero_state_sequence() {
        // [5,0,0,3,0] -> Clear, Single, Repeated, Clear, Single
        let t = table(
            &["b"],
            &[vec![Some(5.0), Some(0.0), Some(0.0), Some(3.0), Some(0.0)]],
        );
        let (flags, stats) = QualityFlagger::new(4).flag(&t);

        let states: Vec<ZeroState> = flags.iter().map(|f| f.zero_state).collect();
        assert_eq!(
            states,
            vec![
                ZeroState::Clear,
                ZeroState::Single,
                ZeroState::Repeated,
                ZeroState::Clear,
                ZeroState::Single,
            ]
        );
        assert_eq!(stats.zero_clear, 2);
        assert_eq!(stats.zero_single, 2);
        assert_eq!(stats.zero_repeated, 1);
    }

    #[test]
    fn test_repeated_beats_single_across_channels() {
        // a shows an isolated zero exactly when b ends two zeros in a row
        let t = table(
            &["a", "b"],
            &[
                vec![Some(1.0), Some(0.0)],
                vec![Some(0.0), Some(0.0)],
            ],
        );
        let (flags, _) = QualityFlagger::new(4).flag(&t);

        assert_eq!(flags[0].zero_state, ZeroState::Single);
        assert_eq!(flags[1].zero_state, ZeroState::Repeated);
    }

    #[test]
    fn test_missing_resets_zero_run() {
        // A zero after a gap is isolated, not repeated
        let t = table(&["a"], &[vec![Some(0.0), None, Some(0.0)]]);
        let (flags, _) = QualityFlagger::new(4).flag(&t);

        assert_eq!(flags[0].zero_state, ZeroState::Single);
        assert_eq!(flags[1].zero_state, ZeroState::Clear);
        assert_eq!(flags[2].zero_state, ZeroState::Single);
    }

    #[test]
    fn test_inexact_flag_from_any_channel() {
        let mut t = table(&["a", "b"], &[vec![Some(1.0)], vec![Some(2.0)]]);
        t.cells[0][1].kind = MatchKind::Inexact;
        let (flags, stats) = QualityFlagger::new(4).flag(&t);

        assert!(flags[0].inexact);
        assert_eq!(stats.inexact_rows, 1);
    }

    #[test]
    fn test_absent_cells_are_not_inexact() {
        let t = table(&["a", "b"], &[vec![None], vec![None]]);
        let (flags, _) = QualityFlagger::new(4).flag(&t);

        assert!(!flags[0].inexact);
    }

    #[test]
    fn test_stale_channels_in_channel_order() {
        let t = table(
            &["b", "a"],
            &[
                vec![Some(1.0), Some(1.0), Some(1.0)],
                vec![Some(2.0), Some(2.0), Some(2.0)],
            ],
        );
        let (flags, _) = QualityFlagger::new(3).flag(&t);

        assert_eq!(flags[2].stale_channels, vec!["b", "a"]);
    }
}
