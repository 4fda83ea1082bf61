// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use doctor_cell::models::ranges_overlap;
use doctor_cell::CalendarError;
use shared_models::error::{AppError, ErrorKind};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A booking between a patient and a doctor. Only the scheduling service
/// creates and transitions appointments; callers receive copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Appointment {
    pub(crate) id: Uuid,
    pub(crate) patient_id: Uuid,
    pub(crate) doctor_id: Uuid,
    pub(crate) start: DateTime<Utc>,
    pub(crate) end: DateTime<Utc>,
    pub(crate) status: AppointmentStatus,
    pub(crate) note: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn patient_id(&self) -> Uuid {
        self.patient_id
    }

    pub fn doctor_id(&self) -> Uuid {
        self.doctor_id
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn status(&self) -> AppointmentStatus {
        self.status
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn overlaps_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        ranges_overlap(self.start, self.end, start, end)
    }

    pub fn overlaps(&self, other: &Appointment) -> bool {
        self.overlaps_range(other.start, other.end)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Canceled,
    Completed,
    /// Reserved. Rescheduling cancels the original and books a new
    /// appointment, so nothing is ever moved into this state.
    Rescheduled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Canceled => write!(f, "canceled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Rescheduled => write!(f, "rescheduled"),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_start: DateTime<Utc>,
    pub new_end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotateAppointmentRequest {
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentSearchQuery {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.patient_id.map_or(true, |id| appointment.patient_id == id)
            && self.doctor_id.map_or(true, |id| appointment.doctor_id == id)
            && self.status.map_or(true, |status| appointment.status == status)
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Invalid appointment interval: start {start} must be before end {end}")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Appointment {0} not found")]
    NotFound(Uuid),

    #[error("Slot unavailable on the doctor's calendar")]
    SlotUnavailable,

    #[error("Conflicts with confirmed appointment {0}")]
    ConfirmedConflict(Uuid),

    #[error("Patient already booked in this interval (appointment {0})")]
    PatientAlreadyBooked(Uuid),

    #[error("Cannot {action} an appointment that is {status}")]
    InvalidStatusTransition {
        status: AppointmentStatus,
        action: &'static str,
    },

    #[error("Cannot cancel past appointment (started at {0})")]
    CancelAfterStart(DateTime<Utc>),

    #[error("Cannot complete an appointment before it starts at {0}")]
    CompleteBeforeStart(DateTime<Utc>),

    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

impl AppointmentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppointmentError::InvalidInterval { .. } | AppointmentError::NotFound(_) => ErrorKind::Validation,
            AppointmentError::Calendar(err) => err.kind(),
            AppointmentError::SlotUnavailable
            | AppointmentError::ConfirmedConflict(_)
            | AppointmentError::PatientAlreadyBooked(_)
            | AppointmentError::InvalidStatusTransition { .. }
            | AppointmentError::CancelAfterStart(_)
            | AppointmentError::CompleteBeforeStart(_) => ErrorKind::Scheduling,
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match (&err, err.kind()) {
            (AppointmentError::NotFound(_), _) => AppError::NotFound(err.to_string()),
            (_, ErrorKind::Validation) => AppError::ValidationError(err.to_string()),
            (_, ErrorKind::Scheduling) => AppError::Conflict(err.to_string()),
        }
    }
}
