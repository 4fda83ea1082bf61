// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::SchedulingService;

pub fn appointment_routes(config: Arc<AppConfig>, scheduler: Arc<SchedulingService>) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment).get(handlers::search_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/confirm", post(handlers::confirm_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/reschedule", post(handlers::reschedule_appointment))
        .route("/{appointment_id}/note", put(handlers::annotate_appointment))
        .route("/{appointment_id}/complete", post(handlers::complete_appointment))

        // Appointment listings
        .route("/patients/{patient_id}", get(handlers::get_patient_appointments))
        .route("/doctors/{doctor_id}", get(handlers::get_doctor_appointments))

        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(scheduler)
}

pub fn calendar_routes(config: Arc<AppConfig>, scheduler: Arc<SchedulingService>) -> Router {
    // Anyone may browse bookable slots
    let public_routes = Router::new()
        .route("/{doctor_id}/slots", get(handlers::get_available_slots));

    let protected_routes = Router::new()
        .route("/{doctor_id}/slots", post(handlers::add_interval))
        .route("/{doctor_id}/slots/unblock", post(handlers::unblock_interval))
        .route("/{doctor_id}/calendar", get(handlers::get_calendar))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(scheduler)
}
