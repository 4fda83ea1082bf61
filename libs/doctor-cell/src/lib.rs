pub mod error;
pub mod models;
pub mod services;

// Re-export the calendar primitives for the scheduling cell
pub use error::CalendarError;
pub use models::{Interval, IntervalRequest};
pub use services::AvailabilityCalendar;
