pub mod conflict;
pub mod lifecycle;
pub mod scheduling;

pub use conflict::ConflictDetectionService;
pub use scheduling::{SchedulingService, SchedulingStore};
