use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;

/// Half-open time range `[start, end)` on a doctor's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "IntervalRequest")]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    #[serde(default)]
    blocked: bool,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, blocked: bool) -> Result<Self, CalendarError> {
        if start >= end {
            return Err(CalendarError::InvalidInterval { start, end });
        }
        Ok(Self { start, end, blocked })
    }

    pub fn open(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, CalendarError> {
        Self::new(start, end, false)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        ranges_overlap(self.start, self.end, other.start, other.end)
    }

    pub fn overlaps_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        ranges_overlap(self.start, self.end, start, end)
    }

    pub fn matches(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start == start && self.end == end
    }
}

/// Overlap test for two half-open ranges.
pub fn ranges_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Request body for publishing, blocking or unblocking an interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub blocked: bool,
}

impl TryFrom<IntervalRequest> for Interval {
    type Error = CalendarError;

    fn try_from(request: IntervalRequest) -> Result<Self, Self::Error> {
        Interval::new(request.start, request.end, request.blocked)
    }
}
