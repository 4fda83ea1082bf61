// libs/appointment-cell/src/services/scheduling.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use doctor_cell::{AvailabilityCalendar, Interval};

use crate::models::{Appointment, AppointmentError, AppointmentSearchQuery};
use crate::services::conflict::ConflictDetectionService;

// ==============================================================================
// SCHEDULING STORE
// ==============================================================================

/// Owns every calendar and appointment. All mutation goes through these
/// methods.
#[derive(Debug, Default)]
pub struct SchedulingStore {
    calendars: HashMap<Uuid, AvailabilityCalendar>,
    appointments: HashMap<Uuid, Appointment>,
}

impl SchedulingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_calendar(&mut self, doctor_id: Uuid) -> &mut AvailabilityCalendar {
        self.calendars.entry(doctor_id).or_insert_with(|| {
            debug!("Creating empty calendar for doctor {}", doctor_id);
            AvailabilityCalendar::new(doctor_id)
        })
    }

    pub fn calendar(&self, doctor_id: Uuid) -> Option<&AvailabilityCalendar> {
        self.calendars.get(&doctor_id)
    }

    pub fn publish_slot(
        &mut self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Interval, AppointmentError> {
        Ok(self.ensure_calendar(doctor_id).add_interval(start, end)?)
    }

    pub fn block_interval(
        &mut self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Interval, AppointmentError> {
        Ok(self.ensure_calendar(doctor_id).block(start, end)?)
    }

    pub fn unblock_interval(&mut self, doctor_id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.ensure_calendar(doctor_id).unblock(start, end)
    }

    /// Open intervals of the doctor not overlapping a confirmed appointment.
    /// Scheduled appointments do not consume a slot.
    pub fn available_slots(&self, doctor_id: Uuid) -> Vec<Interval> {
        let Some(calendar) = self.calendars.get(&doctor_id) else {
            return Vec::new();
        };

        let detector = ConflictDetectionService::new(&self.appointments);
        let confirmed: Vec<&Appointment> = detector.confirmed_for_doctor(doctor_id).collect();

        calendar
            .open_intervals()
            .filter(|interval| {
                !confirmed
                    .iter()
                    .any(|appointment| appointment.overlaps_range(interval.start(), interval.end()))
            })
            .copied()
            .collect()
    }

    pub fn schedule(
        &mut self,
        patient_id: Uuid,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        if start >= end {
            return Err(AppointmentError::InvalidInterval { start, end });
        }

        let has_slot = self
            .calendars
            .get(&doctor_id)
            .and_then(|calendar| calendar.find_exact_free_interval(start, end))
            .is_some();
        if !has_slot {
            warn!("No free interval [{}, {}) for doctor {}", start, end, doctor_id);
            return Err(AppointmentError::SlotUnavailable);
        }

        let detector = ConflictDetectionService::new(&self.appointments);
        if let Some(existing) = detector.confirmed_conflict(doctor_id, start, end, None) {
            return Err(AppointmentError::ConfirmedConflict(existing.id));
        }
        if let Some(existing) = detector.patient_conflict(patient_id, start, end, None) {
            return Err(AppointmentError::PatientAlreadyBooked(existing.id));
        }

        let appointment = Appointment::create(patient_id, doctor_id, start, end, now)?;
        info!(
            "Scheduled appointment {} for patient {} with doctor {} at {}",
            appointment.id, patient_id, doctor_id, start
        );
        self.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    /// Confirms the appointment and cancels every other scheduled appointment
    /// of the same doctor overlapping it.
    pub fn confirm(&mut self, appointment_id: Uuid, now: DateTime<Utc>) -> Result<Appointment, AppointmentError> {
        let appointment = self.appointment_mut(appointment_id)?;
        appointment.confirm(now)?;
        let confirmed = appointment.clone();

        let targets = ConflictDetectionService::new(&self.appointments).cascade_targets(&confirmed);
        for target in targets {
            if let Some(other) = self.appointments.get_mut(&target) {
                if other.force_cancel(now) {
                    info!(
                        "Canceled appointment {} superseded by confirmed appointment {}",
                        target, appointment_id
                    );
                }
            }
        }

        Ok(confirmed)
    }

    pub fn cancel(&mut self, appointment_id: Uuid, now: DateTime<Utc>) -> Result<Appointment, AppointmentError> {
        let appointment = self.appointment_mut(appointment_id)?;
        appointment.cancel(now)?;
        info!("Canceled appointment {}", appointment_id);
        Ok(appointment.clone())
    }

    pub fn complete(&mut self, appointment_id: Uuid, now: DateTime<Utc>) -> Result<Appointment, AppointmentError> {
        let appointment = self.appointment_mut(appointment_id)?;
        appointment.complete(now)?;
        info!("Completed appointment {}", appointment_id);
        Ok(appointment.clone())
    }

    pub fn annotate(
        &mut self,
        appointment_id: Uuid,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.appointment_mut(appointment_id)?;
        appointment.annotate(text, now);
        Ok(appointment.clone())
    }

    /// Cancels the original and books the new range for the same pair.
    /// Either everything happens or nothing does.
    pub fn reschedule(
        &mut self,
        appointment_id: Uuid,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
        confirm_new: bool,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        if new_start >= new_end {
            return Err(AppointmentError::InvalidInterval {
                start: new_start,
                end: new_end,
            });
        }

        let original = self.get(appointment_id)?.clone();

        let detector = ConflictDetectionService::new(&self.appointments);
        if let Some(existing) =
            detector.patient_conflict(original.patient_id, new_start, new_end, Some(appointment_id))
        {
            return Err(AppointmentError::PatientAlreadyBooked(existing.id));
        }
        if let Some(existing) =
            detector.confirmed_conflict(original.doctor_id, new_start, new_end, Some(appointment_id))
        {
            return Err(AppointmentError::ConfirmedConflict(existing.id));
        }

        // Terminal originals stay as they are
        if !self.appointment_mut(appointment_id)?.force_cancel(now) {
            debug!("Original appointment {} already {}", appointment_id, original.status);
        }

        let rebooked = self
            .schedule(original.patient_id, original.doctor_id, new_start, new_end, now)
            .and_then(|booked| {
                if !confirm_new {
                    return Ok(booked);
                }
                let confirmed = self.confirm(booked.id, now);
                if confirmed.is_err() {
                    self.appointments.remove(&booked.id);
                }
                confirmed
            });

        match rebooked {
            Ok(booked) => {
                info!(
                    "Rescheduled appointment {} to {} ({} at {})",
                    appointment_id, booked.id, booked.status, new_start
                );
                Ok(booked)
            }
            Err(err) => {
                warn!("Reschedule of {} failed, restoring original: {}", appointment_id, err);
                self.appointments.insert(appointment_id, original);
                Err(err)
            }
        }
    }

    pub fn get(&self, appointment_id: Uuid) -> Result<&Appointment, AppointmentError> {
        self.appointments
            .get(&appointment_id)
            .ok_or(AppointmentError::NotFound(appointment_id))
    }

    pub fn patient_history(&self, patient_id: Uuid) -> Vec<Appointment> {
        self.search(&AppointmentSearchQuery {
            patient_id: Some(patient_id),
            ..Default::default()
        })
    }

    pub fn doctor_appointments(&self, doctor_id: Uuid) -> Vec<Appointment> {
        self.search(&AppointmentSearchQuery {
            doctor_id: Some(doctor_id),
            ..Default::default()
        })
    }

    pub fn search(&self, query: &AppointmentSearchQuery) -> Vec<Appointment> {
        let mut found: Vec<Appointment> = self
            .appointments
            .values()
            .filter(|appointment| query.matches(appointment))
            .cloned()
            .collect();
        found.sort_by_key(|appointment| (appointment.start, appointment.created_at));
        found
    }

    fn appointment_mut(&mut self, appointment_id: Uuid) -> Result<&mut Appointment, AppointmentError> {
        self.appointments
            .get_mut(&appointment_id)
            .ok_or(AppointmentError::NotFound(appointment_id))
    }
}

// ==============================================================================
// SCHEDULING SERVICE
// ==============================================================================

/// Async handle shared by the HTTP layer. One lock covers calendars and
/// appointments so cascades and reschedules never interleave with bookings.
#[derive(Debug, Clone, Default)]
pub struct SchedulingService {
    store: Arc<RwLock<SchedulingStore>>,
}

impl SchedulingService {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(skip(self))]
    pub async fn ensure_calendar(&self, doctor_id: Uuid) -> AvailabilityCalendar {
        self.store.write().await.ensure_calendar(doctor_id).clone()
    }

    /// Every interval of the doctor, open and blocked. Empty when the doctor
    /// has never published anything.
    pub async fn calendar_intervals(&self, doctor_id: Uuid) -> Vec<Interval> {
        self.store
            .read()
            .await
            .calendar(doctor_id)
            .map(|calendar| calendar.intervals().to_vec())
            .unwrap_or_default()
    }

    #[instrument(skip(self))]
    pub async fn publish_slot(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Interval, AppointmentError> {
        let interval = self.store.write().await.publish_slot(doctor_id, start, end)?;
        info!("Published slot [{}, {}) for doctor {}", start, end, doctor_id);
        Ok(interval)
    }

    #[instrument(skip(self))]
    pub async fn block_interval(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Interval, AppointmentError> {
        let interval = self.store.write().await.block_interval(doctor_id, start, end)?;
        info!("Blocked [{}, {}) for doctor {}", start, end, doctor_id);
        Ok(interval)
    }

    #[instrument(skip(self))]
    pub async fn unblock_interval(&self, doctor_id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.store.write().await.unblock_interval(doctor_id, start, end)
    }

    pub async fn available_slots(&self, doctor_id: Uuid) -> Vec<Interval> {
        self.store.read().await.available_slots(doctor_id)
    }

    #[instrument(skip(self))]
    pub async fn schedule(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        self.store
            .write()
            .await
            .schedule(patient_id, doctor_id, start, end, Utc::now())
    }

    #[instrument(skip(self))]
    pub async fn confirm(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store.write().await.confirm(appointment_id, Utc::now())
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, appointment_id: Uuid, now: DateTime<Utc>) -> Result<Appointment, AppointmentError> {
        self.store.write().await.cancel(appointment_id, now)
    }

    #[instrument(skip(self))]
    pub async fn complete(&self, appointment_id: Uuid, now: DateTime<Utc>) -> Result<Appointment, AppointmentError> {
        self.store.write().await.complete(appointment_id, now)
    }

    #[instrument(skip(self, text))]
    pub async fn annotate(&self, appointment_id: Uuid, text: &str) -> Result<Appointment, AppointmentError> {
        self.store.write().await.annotate(appointment_id, text, Utc::now())
    }

    #[instrument(skip(self))]
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
        confirm_new: bool,
    ) -> Result<Appointment, AppointmentError> {
        self.store
            .write()
            .await
            .reschedule(appointment_id, new_start, new_end, confirm_new, Utc::now())
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store.read().await.get(appointment_id).cloned()
    }

    pub async fn patient_history(&self, patient_id: Uuid) -> Vec<Appointment> {
        self.store.read().await.patient_history(patient_id)
    }

    pub async fn doctor_appointments(&self, doctor_id: Uuid) -> Vec<Appointment> {
        self.store.read().await.doctor_appointments(doctor_id)
    }

    pub async fn search(&self, query: &AppointmentSearchQuery) -> Vec<Appointment> {
        self.store.read().await.search(query)
    }
}
