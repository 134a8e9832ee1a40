//! Time types for submissions.
//!
//! This module provides [`OrganizerZone`], the single configured zone every
//! wall-clock time is interpreted in, and [`TimeWindow`] for the half-open
//! intervals used by availability checks.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;

/// The fixed organizer time zone.
///
/// Wraps an IANA zone. All appointment and timed-task wall-clock values are
/// localized here before they are sent to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrganizerZone(Tz);

impl OrganizerZone {
    /// Creates a zone from a parsed `chrono_tz::Tz`.
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Returns the underlying zone.
    pub fn tz(&self) -> Tz {
        self.0
    }

    /// Returns the IANA name, e.g. `"America/New_York"`.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Maps a wall-clock time to exactly one instant in this zone.
    ///
    /// Times that fall in a DST gap or fold are rejected instead of guessed.
    pub fn localize(&self, local: NaiveDateTime) -> Result<DateTime<Tz>, ValidationError> {
        match self.0.from_local_datetime(&local) {
            LocalResult::Single(dt) => Ok(dt),
            LocalResult::Ambiguous(_, _) | LocalResult::None => {
                Err(ValidationError::AmbiguousLocalTime {
                    local,
                    zone: self.name().to_string(),
                })
            }
        }
    }
}

impl FromStr for OrganizerZone {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<Tz>()
            .map(Self)
            .map_err(|_| ValidationError::UnknownTimeZone(s.to_string()))
    }
}

impl fmt::Display for OrganizerZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A half-open interval `[start, end)` in UTC.
///
/// Used both for the slot being booked and for the busy intervals the
/// provider reports back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Creates a window from zoned endpoints.
    pub fn from_zoned<Z: TimeZone>(start: &DateTime<Z>, end: &DateTime<Z>) -> Self {
        Self::new(start.with_timezone(&Utc), end.with_timezone(&Utc))
    }

    /// Returns the duration of this time window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Returns true if the two windows share any instant.
    ///
    /// Touching endpoints do not overlap: `[9:00, 9:30)` and `[9:30, 10:00)`
    /// are disjoint.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns true if the window is empty (`start == end`).
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}
