use chrono::{DateTime, Duration, DurationRound, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use appointment_cell::services::SchedulingService;

pub const DEMO_DOCTORS: [Uuid; 2] = [
    Uuid::from_u128(0x0d0c_0000_0000_4000_8000_0000_0000_0001),
    Uuid::from_u128(0x0d0c_0000_0000_4000_8000_0000_0000_0002),
];

pub const DEMO_PATIENTS: [Uuid; 2] = [
    Uuid::from_u128(0x9a71_0000_0000_4000_8000_0000_0000_0001),
    Uuid::from_u128(0x9a71_0000_0000_4000_8000_0000_0000_0002),
];

/// Publishes a few hours of demo availability and two bookings. Nothing
/// here is fatal: a rejected step is logged and skipped.
pub async fn seed_demo_data(scheduler: &SchedulingService, now: DateTime<Utc>) {
    let base = now
        .duration_trunc(Duration::hours(1))
        .unwrap_or(now)
        + Duration::hours(1);
    let slot = Duration::minutes(30);

    for doctor in DEMO_DOCTORS {
        for offset in 1..6 {
            let start = base + Duration::hours(offset);
            if let Err(err) = scheduler.publish_slot(doctor, start, start + slot).await {
                warn!("Demo slot for doctor {} at {} skipped: {}", doctor, start, err);
            }
        }

        let lunch = base + Duration::hours(3) + Duration::minutes(30);
        if let Err(err) = scheduler.block_interval(doctor, lunch, lunch + slot).await {
            warn!("Demo lunch block for doctor {} skipped: {}", doctor, err);
        }
    }

    let first = base + Duration::hours(1);
    match scheduler.schedule(DEMO_PATIENTS[0], DEMO_DOCTORS[0], first, first + slot).await {
        Ok(appointment) => {
            if let Err(err) = scheduler.confirm(appointment.id()).await {
                warn!("Demo confirmation skipped: {}", err);
            }
        }
        Err(err) => warn!("Demo booking skipped: {}", err),
    }

    let second = base + Duration::hours(2);
    if let Err(err) = scheduler
        .schedule(DEMO_PATIENTS[1], DEMO_DOCTORS[1], second, second + slot)
        .await
    {
        warn!("Demo booking skipped: {}", err);
    }

    info!(
        "Seeded demo data: doctors {:?}, patients {:?}",
        DEMO_DOCTORS, DEMO_PATIENTS
    );
}
