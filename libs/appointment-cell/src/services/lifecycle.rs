// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

impl AppointmentStatus {
    /// Scheduled and confirmed appointments still hold their interval.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Canceled | AppointmentStatus::Completed)
    }

    /// Statuses reachable from this one through the public transitions.
    pub fn valid_transitions(&self) -> Vec<AppointmentStatus> {
        match self {
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Canceled,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::Canceled,
                AppointmentStatus::Completed,
            ],
            // Never assigned, but nothing forbids leaving it
            AppointmentStatus::Rescheduled => vec![AppointmentStatus::Canceled],
            AppointmentStatus::Canceled | AppointmentStatus::Completed => vec![],
        }
    }
}

impl Appointment {
    /// New appointment in `Scheduled` status.
    pub fn create(
        patient_id: Uuid,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self, AppointmentError> {
        if start >= end {
            return Err(AppointmentError::InvalidInterval { start, end });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            start,
            end,
            status: AppointmentStatus::Scheduled,
            note: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn confirm(&mut self, now: DateTime<Utc>) -> Result<(), AppointmentError> {
        if self.status != AppointmentStatus::Scheduled {
            warn!("Refusing to confirm appointment {} in status {}", self.id, self.status);
            return Err(self.illegal("confirm"));
        }
        self.transition(AppointmentStatus::Confirmed, now);
        Ok(())
    }

    /// Caller-requested cancellation: only before the appointment starts.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), AppointmentError> {
        if self.status.is_terminal() {
            warn!("Refusing to cancel appointment {} in status {}", self.id, self.status);
            return Err(self.illegal("cancel"));
        }
        if self.start <= now {
            warn!("Refusing to cancel appointment {} that started at {}", self.id, self.start);
            return Err(AppointmentError::CancelAfterStart(self.start));
        }
        self.transition(AppointmentStatus::Canceled, now);
        Ok(())
    }

    /// Marks a confirmed consultation as held. It must have started.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), AppointmentError> {
        if self.status != AppointmentStatus::Confirmed {
            warn!("Refusing to complete appointment {} in status {}", self.id, self.status);
            return Err(self.illegal("complete"));
        }
        if now < self.start {
            return Err(AppointmentError::CompleteBeforeStart(self.start));
        }
        self.transition(AppointmentStatus::Completed, now);
        Ok(())
    }

    /// Replaces the note. Blank text clears it.
    pub fn annotate(&mut self, text: &str, now: DateTime<Utc>) {
        let trimmed = text.trim();
        self.note = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self.updated_at = now;
    }

    /// Administrative cancellation used by confirmation cascades and
    /// rescheduling. Ignores the start-time guard; terminal appointments are
    /// left untouched. Returns whether the status changed.
    pub(crate) fn force_cancel(&mut self, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.transition(AppointmentStatus::Canceled, now);
        true
    }

    fn transition(&mut self, to: AppointmentStatus, now: DateTime<Utc>) {
        debug_assert!(self.status.valid_transitions().contains(&to));
        debug!("Appointment {} {} -> {}", self.id, self.status, to);
        self.status = to;
        self.updated_at = now;
    }

    fn illegal(&self, action: &'static str) -> AppointmentError {
        AppointmentError::InvalidStatusTransition {
            status: self.status,
            action,
        }
    }
}
