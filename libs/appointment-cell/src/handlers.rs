// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use doctor_cell::IntervalRequest;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AnnotateAppointmentRequest, Appointment, AppointmentSearchQuery, BookAppointmentRequest,
    RescheduleAppointmentRequest,
};
use crate::services::SchedulingService;

// ==============================================================================
// AUTHORIZATION HELPERS
// ==============================================================================

fn is_participant(user: &User, appointment: &Appointment) -> bool {
    user.is_subject(&appointment.patient_id()) || user.is_subject(&appointment.doctor_id())
}

fn ensure_participant_or_admin(user: &User, appointment: &Appointment, action: &str) -> Result<(), AppError> {
    if is_participant(user, appointment) || user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("Not authorized to {} this appointment", action)))
    }
}

fn ensure_appointment_doctor(user: &User, appointment: &Appointment, action: &str) -> Result<(), AppError> {
    if user.is_doctor() && user.is_subject(&appointment.doctor_id()) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("Only the appointment's doctor can {} it", action)))
    }
}

fn ensure_self_or_admin(user: &User, id: Uuid, what: &str) -> Result<(), AppError> {
    if user.is_subject(&id) || user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("Not authorized to access this {}", what)))
    }
}

fn ensure_calendar_owner(user: &User, doctor_id: Uuid) -> Result<(), AppError> {
    if (user.is_doctor() && user.is_subject(&doctor_id)) || user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only the doctor or an admin can manage this calendar".to_string()))
    }
}

// ==============================================================================
// CALENDAR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_slots(
    State(scheduler): State<Arc<SchedulingService>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let slots = scheduler.available_slots(doctor_id).await;
    debug!("Doctor {} has {} available slots", doctor_id, slots.len());

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "slots": slots,
        "total": slots.len()
    })))
}

#[axum::debug_handler]
pub async fn get_calendar(
    State(scheduler): State<Arc<SchedulingService>>,
    Path(doctor_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    ensure_calendar_owner(&user, doctor_id)?;

    let intervals = scheduler.calendar_intervals(doctor_id).await;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "intervals": intervals
    })))
}

/// Publishes an open slot, or blocks the range when `blocked` is set.
#[axum::debug_handler]
pub async fn add_interval(
    State(scheduler): State<Arc<SchedulingService>>,
    Path(doctor_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<IntervalRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    ensure_calendar_owner(&user, doctor_id)?;

    let interval = if request.blocked {
        scheduler.block_interval(doctor_id, request.start, request.end).await?
    } else {
        scheduler.publish_slot(doctor_id, request.start, request.end).await?
    };
    let slots = scheduler.available_slots(doctor_id).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "interval": interval,
            "slots": slots
        })),
    ))
}

#[axum::debug_handler]
pub async fn unblock_interval(
    State(scheduler): State<Arc<SchedulingService>>,
    Path(doctor_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<IntervalRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_calendar_owner(&user, doctor_id)?;

    let removed = scheduler.unblock_interval(doctor_id, request.start, request.end).await;
    let slots = scheduler.available_slots(doctor_id).await;

    Ok(Json(json!({
        "success": true,
        "removed": removed,
        "slots": slots
    })))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(scheduler): State<Arc<SchedulingService>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let is_patient = user.is_patient() && user.is_subject(&request.patient_id);
    if !is_patient && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to book appointment for this patient".to_string(),
        ));
    }

    let appointment = scheduler
        .schedule(request.patient_id, request.doctor_id, request.start, request.end)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment,
            "message": "Appointment booked successfully"
        })),
    ))
}

/// Lists appointments. Patients and doctors are pinned to their own records.
#[axum::debug_handler]
pub async fn search_appointments(
    State(scheduler): State<Arc<SchedulingService>>,
    Extension(user): Extension<User>,
    Query(mut query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        let own_id = Uuid::parse_str(&user.id)
            .map_err(|_| AppError::Forbidden("Caller id is not a valid identifier".to_string()))?;

        if user.is_patient() {
            query.patient_id = Some(own_id);
        } else if user.is_doctor() {
            query.doctor_id = Some(own_id);
        } else {
            return Err(AppError::Forbidden("Not authorized to list appointments".to_string()));
        }
    }

    let appointments = scheduler.search(&query).await;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(scheduler): State<Arc<SchedulingService>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointment = scheduler.get_appointment(appointment_id).await?;
    ensure_participant_or_admin(&user, &appointment, "view")?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(scheduler): State<Arc<SchedulingService>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointment = scheduler.get_appointment(appointment_id).await?;
    ensure_appointment_doctor(&user, &appointment, "confirm")?;

    let confirmed = scheduler.confirm(appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": confirmed,
        "message": "Appointment confirmed"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(scheduler): State<Arc<SchedulingService>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointment = scheduler.get_appointment(appointment_id).await?;
    ensure_participant_or_admin(&user, &appointment, "cancel")?;

    let canceled = scheduler.cancel(appointment_id, Utc::now()).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": canceled,
        "message": "Appointment canceled"
    })))
}

/// A doctor rescheduling their own appointment confirms the new one directly.
#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(scheduler): State<Arc<SchedulingService>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = scheduler.get_appointment(appointment_id).await?;
    ensure_participant_or_admin(&user, &appointment, "reschedule")?;

    let confirm_new = user.is_doctor() && user.is_subject(&appointment.doctor_id());
    let rescheduled = scheduler
        .reschedule(appointment_id, request.new_start, request.new_end, confirm_new)
        .await?;

    Ok(Json(json!({
        "success": true,
        "previous_appointment_id": appointment_id,
        "appointment": rescheduled,
        "message": "Appointment rescheduled"
    })))
}

#[axum::debug_handler]
pub async fn annotate_appointment(
    State(scheduler): State<Arc<SchedulingService>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<AnnotateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = scheduler.get_appointment(appointment_id).await?;
    ensure_participant_or_admin(&user, &appointment, "annotate")?;

    let annotated = scheduler.annotate(appointment_id, &request.note).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": annotated
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(scheduler): State<Arc<SchedulingService>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointment = scheduler.get_appointment(appointment_id).await?;
    ensure_appointment_doctor(&user, &appointment, "complete")?;

    let completed = scheduler.complete(appointment_id, Utc::now()).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": completed,
        "message": "Appointment completed"
    })))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(scheduler): State<Arc<SchedulingService>>,
    Path(patient_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    ensure_self_or_admin(&user, patient_id, "patient's appointments")?;

    let appointments = scheduler.patient_history(patient_id).await;

    Ok(Json(json!({
        "patient_id": patient_id,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(scheduler): State<Arc<SchedulingService>>,
    Path(doctor_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    ensure_self_or_admin(&user, doctor_id, "doctor's appointments")?;

    let appointments = scheduler.doctor_appointments(doctor_id).await;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "appointments": appointments,
        "total": appointments.len()
    })))
}
