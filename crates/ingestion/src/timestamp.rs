//! Heterogeneous timestamp normalization.
//!
//! Parses one date/time string at a time against a fixed, prioritized
//! pattern list and resolves it to an absolute instant in a configured
//! zone. A recognized trailing zone abbreviation (e.g. `EST`) overrides
//! the configured zone for that single value; unrecognized trailing
//! tokens are stripped best-effort.

use chrono::{Duration, FixedOffset, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use sensorgrid_core::{Error, Result, TimePoint};

/// Recognized trailing zone abbreviations with their fixed UTC offsets
/// in seconds. Abbreviations name a concrete offset, not a region, so a
/// fixed-offset resolution is exact.
const ZONE_ABBREVIATIONS: &[(&str, i32)] = &[
    ("UTC", 0),
    ("GMT", 0),
    ("EST", -5 * 3600),
    ("EDT", -4 * 3600),
    ("CST", -6 * 3600),
    ("CDT", -5 * 3600),
    ("MST", -7 * 3600),
    ("MDT", -6 * 3600),
    ("PST", -8 * 3600),
    ("PDT", -7 * 3600),
];

/// Supported patterns in fixed priority order: ISO, US slash, text month.
/// Within each family, AM/PM variants come first so a meridian token wins
/// over a 24-hour interpretation of the same digits.
const PATTERNS: &[&str] = &[
    // ISO style: YYYY-MM-DD[ T]HH:MM[:SS]
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    // US slash style: M/D/YYYY H:MM[:SS][ AM|PM]
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    // Text month style: Month D, YYYY H:MM[:SS][ AM|PM]
    "%B %d, %Y %I:%M:%S %p",
    "%B %d, %Y %I:%M %p",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
];

/// Normalizes raw timestamp strings into [`TimePoint`]s for one zone.
///
/// Deterministic and side-effect free: identical input and zone always
/// yield the identical instant.
#[derive(Debug, Clone, Copy)]
pub struct TimestampNormalizer {
    zone: Tz,
}

impl TimestampNormalizer {
    /// Create a normalizer for the given configured zone.
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    /// The configured zone applied when a value carries no abbreviation.
    #[inline]
    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Parse a raw string into an absolute instant.
    ///
    /// # Errors
    /// Returns `Error::UnparseableTimestamp` when no supported pattern
    /// matches the (possibly token-stripped) input.
    pub fn normalize(&self, raw: &str) -> Result<TimePoint> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::UnparseableTimestamp(raw.to_string()));
        }

        if let Some(naive) = parse_naive(trimmed) {
            return self.resolve_local(naive, raw);
        }

        // Strip trailing tokens one at a time until the head parses or
        // nothing splittable remains.
        let mut head = trimmed;
        while let Some((rest, token)) = split_trailing_token(head) {
            if let Some(offset_secs) = zone_offset(token) {
                // A recognized abbreviation overrides the configured zone
                // for this single value; display stays in the configured zone.
                let naive = parse_naive(rest)
                    .ok_or_else(|| Error::UnparseableTimestamp(raw.to_string()))?;
                return self.resolve_fixed(naive, offset_secs, raw);
            }
            // Unrecognized token: drop it best-effort and retry.
            if let Some(naive) = parse_naive(rest) {
                return self.resolve_local(naive, raw);
            }
            head = rest;
        }

        Err(Error::UnparseableTimestamp(raw.to_string()))
    }

    /// The chrono pattern the value would parse under, for diagnostics.
    /// Applies the same trailing-token stripping as [`Self::normalize`].
    pub fn detect_pattern(raw: &str) -> Option<&'static str> {
        let mut candidate = raw.trim();
        loop {
            if let Some(p) = PATTERNS
                .iter()
                .find(|p| NaiveDateTime::parse_from_str(candidate, p).is_ok())
            {
                return Some(p);
            }
            match split_trailing_token(candidate) {
                Some((rest, _)) => candidate = rest,
                None => return None,
            }
        }
    }

    fn resolve_fixed(&self, naive: NaiveDateTime, offset_secs: i32, raw: &str) -> Result<TimePoint> {
        let offset = FixedOffset::east_opt(offset_secs)
            .ok_or_else(|| Error::UnparseableTimestamp(raw.to_string()))?;
        let instant = offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| Error::UnparseableTimestamp(raw.to_string()))?
            .with_timezone(&Utc);
        Ok(TimePoint::new(instant, self.zone))
    }

    fn resolve_local(&self, naive: NaiveDateTime, raw: &str) -> Result<TimePoint> {
        let instant = match self.zone.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt.with_timezone(&Utc),
            // Fall-back overlap: pick the earlier of the two mappings.
            LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
            // Spring-forward gap: the wall time does not exist; shift
            // forward one hour.
            LocalResult::None => self
                .zone
                .from_local_datetime(&(naive + Duration::hours(1)))
                .earliest()
                .ok_or_else(|| Error::UnparseableTimestamp(raw.to_string()))?
                .with_timezone(&Utc),
        };
        Ok(TimePoint::new(instant, self.zone))
    }
}

/// Try every supported pattern in priority order; first match wins.
fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    PATTERNS
        .iter()
        .find_map(|p| NaiveDateTime::parse_from_str(s, p).ok())
}

/// Split off a trailing 2-4 letter token that could be a zone
/// abbreviation. AM/PM markers belong to the time patterns and are never
/// split off.
fn split_trailing_token(s: &str) -> Option<(&str, &str)> {
    let (head, tail) = s.rsplit_once(char::is_whitespace)?;
    let candidate = tail.trim();
    if candidate.len() < 2 || candidate.len() > 4 {
        return None;
    }
    if !candidate.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    if candidate.eq_ignore_ascii_case("AM") || candidate.eq_ignore_ascii_case("PM") {
        return None;
    }
    Some((head.trim_end(), candidate))
}

/// Look up a zone abbreviation's fixed offset in seconds.
fn zone_offset(token: &str) -> Option<i32> {
    ZONE_ABBREVIATIONS
        .iter()
        .find(|(abbr, _)| abbr.eq_ignore_ascii_case(token))
        .map(|(_, secs)| *secs)
}
