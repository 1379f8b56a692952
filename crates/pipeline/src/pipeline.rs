//! End-to-end orchestration: load -> merge -> resample -> flag.
//!
//! The pipeline owns run-level duties the stage crates stay out of:
//! channel-name collision suffixing, per-source zone resolution with
//! degradation, and assembly of the output rows and run report. One bad
//! source degrades to an all-missing column; it never fails the run.

use crate::output::{build_rows, OutputRow};
use crate::report::{ChannelLoadReport, RunReport};
use sensorgrid_core::{
    ChannelSeries, Error, MergedTable, PipelineConfig, ResampledTable, Result, SourceConfig,
};
use sensorgrid_ingestion::{merge, LoadStats, SeriesLoader};
use sensorgrid_quality::{QualityFlagger, QuarterHourResampler};
use std::collections::HashSet;

/// One source's extraction config plus its pre-split records.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub config: SourceConfig,
    pub records: Vec<Vec<String>>,
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Timestamp-sorted outer alignment of all channels (pre-resample
    /// export point).
    pub merged: MergedTable,
    /// The quarter-hour grid with per-cell match classification.
    pub resampled: ResampledTable,
    /// Final quality-annotated rows in canonical display format.
    pub rows: Vec<OutputRow>,
    /// Full drop/substitution accounting for the run.
    pub report: RunReport,
}

/// Batch engine running all stages over a set of sources.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the full pipeline over `sources`.
    ///
    /// # Errors
    /// Only configuration-shaped misuse (non-positive step, negative
    /// tolerance) returns `Err`. Source-level problems degrade the
    /// affected channel and are recorded in the report.
    pub fn run(&self, sources: Vec<SourceSpec>) -> Result<PipelineOutput> {
        self.validate()?;

        let names = suffix_collisions(sources.iter().map(|s| s.config.channel_name.as_str()));

        let mut series = Vec::with_capacity(sources.len());
        let mut channel_reports = Vec::with_capacity(sources.len());

        for (source, name) in sources.iter().zip(names) {
            let (channel, report) = self.load_source(source, name);
            tracing::debug!(
                channel = %report.channel,
                rows = report.stats.rows_read,
                values = report.stats.values,
                dropped = report.stats.dropped_rows(),
                "loaded source"
            );
            series.push(channel);
            channel_reports.push(report);
        }

        let merged = merge(series);
        let resampler =
            QuarterHourResampler::new(self.config.tolerance_minutes, self.config.step_minutes)?;
        let (resampled, resample_stats) = resampler.resample(&merged);
        let flagger = QualityFlagger::new(self.config.stale_run_length);
        let (flags, flag_stats) = flagger.flag(&resampled);
        let rows = build_rows(&resampled, &flags);

        let empty_channels: Vec<String> = channel_reports
            .iter()
            .filter(|r| r.is_empty())
            .map(|r| r.channel.clone())
            .collect();

        tracing::info!(
            channels = merged.channels.len(),
            merged_rows = merged.len(),
            slots = resampled.len(),
            exact = resample_stats.exact_cells,
            inexact = resample_stats.inexact_cells,
            absent = resample_stats.absent_cells,
            empty_channels = empty_channels.len(),
            "pipeline run complete"
        );

        Ok(PipelineOutput {
            merged,
            resampled,
            rows,
            report: RunReport {
                channels: channel_reports,
                empty_channels,
                resample: resample_stats,
                flags: flag_stats,
            },
        })
    }

    /// Load one source into a channel series, degrading to an all-missing
    /// channel when the source's zone id does not resolve.
    fn load_source(&self, source: &SourceSpec, name: String) -> (ChannelSeries, ChannelLoadReport) {
        let zone = match source.config.resolve_zone(self.config.default_zone) {
            Ok(zone) => zone,
            Err(err) => {
                tracing::warn!(channel = %name, error = %err, "source degraded to empty channel");
                return (
                    ChannelSeries::empty(&name),
                    ChannelLoadReport {
                        channel: name,
                        stats: LoadStats::default(),
                        error: Some(err.to_string()),
                    },
                );
            }
        };

        let mut config = source.config.clone();
        config.channel_name = name.clone();
        let (channel, stats) = SeriesLoader::new(zone).load(&config, &source.records);

        if stats.is_empty_channel() {
            tracing::warn!(channel = %name, "channel yielded no usable values");
        }

        (
            channel,
            ChannelLoadReport {
                channel: name,
                stats,
                error: None,
            },
        )
    }

    fn validate(&self) -> Result<()> {
        if self.config.step_minutes <= 0 {
            return Err(Error::config(format!(
                "step_minutes must be positive, got {}",
                self.config.step_minutes
            )));
        }
        if self.config.tolerance_minutes < 0 {
            return Err(Error::config(format!(
                "tolerance_minutes must be non-negative, got {}",
                self.config.tolerance_minutes
            )));
        }
        Ok(())
    }
}

/// Resolve duplicate channel names in source order: the first occurrence
/// keeps its name, later ones get `_2`, `_3`, ... Generated names count
/// as taken, so a suffix never collides with a literal channel name
/// (`a`, `a_2`, `a` resolves to `a`, `a_2`, `a_3`).
fn suffix_collisions<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    names
        .map(|name| {
            if taken.insert(name.to_string()) {
                return name.to_string();
            }
            let mut n = 2;
            loop {
                let candidate = format!("{name}_{n}");
                if taken.insert(candidate.clone()) {
                    return candidate;
                }
                n += 1;
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use sensorgrid_core::ZeroState;
    use sensorgrid_ingestion::split_records;

    fn source(name: &str, rows: &[&str]) -> SourceSpec {
        SourceSpec {
            config: SourceConfig {
                header_row_index: 0,
                delimiter: ',',
                time_column: 0,
                value_column: 1,
                channel_name: name.to_string(),
                zone_id: Some("UTC".to_string()),
            },
            records: split_records(rows, ','),
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(PipelineConfig {
            default_zone: chrono_tz::UTC,
            ..PipelineConfig::default()
        })
    }

    #[test]
    fn test_single_channel_round_trip() {
        // Already-gridded input reproduces itself exactly
        let output = pipeline()
            .run(vec![source(
                "Supply Temp",
                &[
                    "Date,Value",
                    "07/18/2024 12:00:00,71.5",
                    "07/18/2024 12:15:00,72.0",
                    "07/18/2024 12:30:00,72.5",
                ],
            )])
            .unwrap();

        assert_eq!(output.rows.len(), 3);
        assert_eq!(output.rows[0].timestamp, "07/18/2024 12:00:00");
        assert_abs_diff_eq!(output.rows[0].values[0].unwrap(), 71.5);
        assert_abs_diff_eq!(output.rows[2].values[0].unwrap(), 72.5);
        assert!(output.rows.iter().all(|r| !r.inexact));
        assert_eq!(output.report.resample.exact_cells, 3);
        assert_eq!(output.report.dropped_rows(), 0);
    }

    #[test]
    fn test_mixed_format_sources_align() {
        // Two sources with different timestamp formats land on the
        // same grid slots
        let output = pipeline()
            .run(vec![
                source(
                    "a",
                    &["Date,Value", "2024-07-18 12:00:00,1.0", "2024-07-18 12:15:00,2.0"],
                ),
                source(
                    "b",
                    &[
                        "Date,Value",
                        "07/18/2024 12:01:00 PM,10.0",
                        "07/18/2024 12:16:30 PM,20.0",
                    ],
                ),
            ])
            .unwrap();

        assert_eq!(output.resampled.channels, vec!["a", "b"]);
        // Grid runs 12:00..12:30 (ceil of b's 12:16:30)
        assert_eq!(output.rows.len(), 3);
        // b's off-grid samples match inexactly within tolerance
        assert_abs_diff_eq!(output.rows[0].values[1].unwrap(), 10.0);
        assert_abs_diff_eq!(output.rows[1].values[1].unwrap(), 20.0);
        assert!(output.rows[0].inexact);
        assert!(output.rows[1].inexact);
        // a's exact samples do not disturb b's column
        assert_abs_diff_eq!(output.rows[1].values[0].unwrap(), 2.0);
        // The trailing slot has no sample within tolerance for either
        assert_eq!(output.rows[2].values, vec![None, None]);
        assert!(!output.rows[2].inexact);
    }

    #[test]
    fn test_duplicate_channel_names_suffixed() {
        let output = pipeline()
            .run(vec![
                source("temp", &["Date,Value", "07/18/2024 12:00:00,1.0"]),
                source("temp", &["Date,Value", "07/18/2024 12:00:00,2.0"]),
                source("temp", &["Date,Value", "07/18/2024 12:00:00,3.0"]),
            ])
            .unwrap();

        assert_eq!(output.merged.channels, vec!["temp", "temp_2", "temp_3"]);
        assert_eq!(output.rows[0].values, vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_generated_suffix_avoids_existing_name() {
        // A literal "a_2" must not be conflated with the suffix generated
        // for the second "a"
        let output = pipeline()
            .run(vec![
                source("a", &["Date,Value", "07/18/2024 12:00:00,1.0"]),
                source("a_2", &["Date,Value", "07/18/2024 12:00:00,2.0"]),
                source("a", &["Date,Value", "07/18/2024 12:00:00,3.0"]),
            ])
            .unwrap();

        assert_eq!(output.merged.channels, vec!["a", "a_2", "a_3"]);
        let unique: std::collections::HashSet<&String> =
            output.merged.channels.iter().collect();
        assert_eq!(unique.len(), output.merged.channels.len());
        assert_eq!(output.rows[0].values, vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_unknown_zone_degrades_channel() {
        let mut bad = source("bad", &["Date,Value", "07/18/2024 12:00:00,1.0"]);
        bad.config.zone_id = Some("Not/AZone".to_string());
        let good = source("good", &["Date,Value", "07/18/2024 12:00:00,1.0"]);

        let output = pipeline().run(vec![bad, good]).unwrap();

        // Schema keeps the degraded column, all-missing
        assert_eq!(output.merged.channels, vec!["bad", "good"]);
        assert_eq!(output.rows[0].values[0], None);
        assert_eq!(output.rows[0].values[1], Some(1.0));
        assert_eq!(output.report.empty_channels, vec!["bad"]);
        assert!(output.report.channels[0].error.is_some());
    }

    #[test]
    fn test_no_sources_yields_empty_output() {
        let output = pipeline().run(vec![]).unwrap();
        assert!(output.merged.is_empty());
        assert!(output.rows.is_empty());
        assert_eq!(output.report.resample.total_slots, 0);
    }

    #[test]
    fn test_flags_flow_to_output_rows() {
        // Four identical values trip the stale flag (default run length 4);
        // a zero row reports through the zero state
        let output = pipeline()
            .run(vec![source(
                "flow",
                &[
                    "Date,Value",
                    "07/18/2024 12:00:00,9.0",
                    "07/18/2024 12:15:00,9.0",
                    "07/18/2024 12:30:00,9.0",
                    "07/18/2024 12:45:00,9.0",
                    "07/18/2024 13:00:00,0",
                ],
            )])
            .unwrap();

        assert_eq!(output.rows[3].stale_channels, vec!["flow"]);
        assert!(output.rows[2].stale_channels.is_empty());
        assert_eq!(output.rows[4].zero_state, ZeroState::Single);
        assert_eq!(output.report.flags.stale_by_channel["flow"], 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let pipeline = Pipeline::new(PipelineConfig {
            step_minutes: 0,
            ..PipelineConfig::default()
        });
        assert!(pipeline.run(vec![]).is_err());
    }

    #[test]
    fn test_zone_renders_in_output() {
        // A New York source's noon local reading renders back in local time
        let mut src = source("ny", &["Date,Value", "07/18/2024 12:00:00,5.0"]);
        src.config.zone_id = Some("America/New_York".to_string());

        let output = pipeline().run(vec![src]).unwrap();
        assert_eq!(output.rows[0].timestamp, "07/18/2024 12:00:00");
    }
}
