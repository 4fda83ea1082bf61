pub mod calendar;

pub use calendar::AvailabilityCalendar;
