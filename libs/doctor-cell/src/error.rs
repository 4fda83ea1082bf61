use chrono::{DateTime, Utc};
use thiserror::Error;

use shared_models::error::ErrorKind;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("Invalid interval: start {start} must be before end {end}")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Interval overlaps existing interval [{existing_start}, {existing_end})")]
    Overlap {
        existing_start: DateTime<Utc>,
        existing_end: DateTime<Utc>,
    },
}

impl CalendarError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CalendarError::InvalidInterval { .. } => ErrorKind::Validation,
            CalendarError::Overlap { .. } => ErrorKind::Scheduling,
        }
    }
}
