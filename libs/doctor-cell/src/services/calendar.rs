// libs/doctor-cell/src/services/calendar.rs
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::CalendarError;
use crate::models::Interval;

/// A doctor's availability: start-ordered intervals, none overlapping,
/// whether open or blocked.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityCalendar {
    doctor_id: Uuid,
    intervals: Vec<Interval>,
}

impl AvailabilityCalendar {
    pub fn new(doctor_id: Uuid) -> Self {
        Self {
            doctor_id,
            intervals: Vec::new(),
        }
    }

    pub fn doctor_id(&self) -> Uuid {
        self.doctor_id
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Publish a bookable interval.
    pub fn add_interval(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Interval, CalendarError> {
        self.insert(Interval::open(start, end)?)
    }

    /// Reserve an interval that can never be booked.
    pub fn block(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Interval, CalendarError> {
        self.insert(Interval::new(start, end, true)?)
    }

    /// Remove blocked intervals with exactly these bounds. Returns whether
    /// anything was removed.
    pub fn unblock(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        let before = self.intervals.len();
        self.intervals
            .retain(|interval| !(interval.is_blocked() && interval.matches(start, end)));
        let removed = before != self.intervals.len();

        debug!(
            "Unblock [{}, {}) for doctor {}: {}",
            start,
            end,
            self.doctor_id,
            if removed { "removed" } else { "no matching blocked interval" }
        );
        removed
    }

    /// The open interval whose bounds equal the request exactly.
    pub fn find_exact_free_interval(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<&Interval> {
        self.intervals.iter().find(|interval| {
            !interval.is_blocked() && interval.overlaps_range(start, end) && interval.matches(start, end)
        })
    }

    pub fn open_intervals(&self) -> impl Iterator<Item = &Interval> {
        self.intervals.iter().filter(|interval| !interval.is_blocked())
    }

    fn insert(&mut self, candidate: Interval) -> Result<Interval, CalendarError> {
        if let Some(existing) = self.intervals.iter().find(|interval| interval.overlaps(&candidate)) {
            debug!(
                "Rejected [{}, {}) for doctor {}: overlaps [{}, {})",
                candidate.start(),
                candidate.end(),
                self.doctor_id,
                existing.start(),
                existing.end()
            );
            return Err(CalendarError::Overlap {
                existing_start: existing.start(),
                existing_end: existing.end(),
            });
        }

        // No overlaps means starts are distinct, so the partition point is exact.
        let position = self
            .intervals
            .partition_point(|interval| interval.start() < candidate.start());
        self.intervals.insert(position, candidate);

        debug!(
            "Stored {} interval [{}, {}) for doctor {}",
            if candidate.is_blocked() { "blocked" } else { "open" },
            candidate.start(),
            candidate.end(),
            self.doctor_id
        );
        Ok(candidate)
    }
}
