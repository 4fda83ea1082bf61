// libs/appointment-cell/src/services/conflict.rs
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus};

/// Read-only conflict queries over the appointment arena.
pub struct ConflictDetectionService<'a> {
    appointments: &'a HashMap<Uuid, Appointment>,
}

impl<'a> ConflictDetectionService<'a> {
    pub fn new(appointments: &'a HashMap<Uuid, Appointment>) -> Self {
        Self { appointments }
    }

    /// Confirmed appointments held by a doctor.
    pub fn confirmed_for_doctor(&self, doctor_id: Uuid) -> impl Iterator<Item = &'a Appointment> + 'a {
        self.appointments.values().filter(move |appointment| {
            appointment.doctor_id == doctor_id && appointment.status == AppointmentStatus::Confirmed
        })
    }

    /// First confirmed appointment of the doctor overlapping `[start, end)`.
    pub fn confirmed_conflict(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
    ) -> Option<&'a Appointment> {
        let conflict = self
            .confirmed_for_doctor(doctor_id)
            .filter(|appointment| Some(appointment.id) != exclude_appointment_id)
            .find(|appointment| appointment.overlaps_range(start, end));

        if let Some(existing) = conflict {
            debug!(
                "Doctor {} has confirmed appointment {} overlapping [{}, {})",
                doctor_id, existing.id, start, end
            );
        }
        conflict
    }

    /// First scheduled or confirmed appointment of the patient, with any
    /// doctor, overlapping `[start, end)`.
    pub fn patient_conflict(
        &self,
        patient_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
    ) -> Option<&'a Appointment> {
        let conflict = self.appointments.values().find(|appointment| {
            appointment.patient_id == patient_id
                && Some(appointment.id) != exclude_appointment_id
                && appointment.status.is_active()
                && appointment.overlaps_range(start, end)
        });

        if let Some(existing) = conflict {
            debug!(
                "Patient {} already holds appointment {} overlapping [{}, {})",
                patient_id, existing.id, start, end
            );
        }
        conflict
    }

    /// Scheduled appointments of the same doctor that lose their claim once
    /// `confirmed` is confirmed.
    pub fn cascade_targets(&self, confirmed: &Appointment) -> Vec<Uuid> {
        self.appointments
            .values()
            .filter(|other| {
                other.id != confirmed.id
                    && other.doctor_id == confirmed.doctor_id
                    && other.status == AppointmentStatus::Scheduled
                    && other.overlaps(confirmed)
            })
            .map(|other| other.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 2, 3, hour, minute, 0).unwrap()
    }

    fn insert(
        arena: &mut HashMap<Uuid, Appointment>,
        patient_id: Uuid,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: AppointmentStatus,
    ) -> Uuid {
        let mut appointment = Appointment::create(patient_id, doctor_id, start, end, at(0, 0)).unwrap();
        appointment.status = status;
        let id = appointment.id;
        arena.insert(id, appointment);
        id
    }

    #[test]
    fn test_confirmed_conflict_ignores_scheduled_and_excluded() {
        let doctor = Uuid::new_v4();
        let mut arena = HashMap::new();
        insert(&mut arena, Uuid::new_v4(), doctor, at(10, 0), at(10, 30), AppointmentStatus::Scheduled);
        let confirmed = insert(&mut arena, Uuid::new_v4(), doctor, at(11, 0), at(11, 30), AppointmentStatus::Confirmed);

        let detector = ConflictDetectionService::new(&arena);
        assert!(detector.confirmed_conflict(doctor, at(10, 0), at(10, 30), None).is_none());
        assert_eq!(
            detector.confirmed_conflict(doctor, at(11, 15), at(11, 45), None).map(|a| a.id),
            Some(confirmed)
        );
        assert!(detector.confirmed_conflict(doctor, at(11, 15), at(11, 45), Some(confirmed)).is_none());
        assert!(detector.confirmed_conflict(Uuid::new_v4(), at(11, 0), at(11, 30), None).is_none());
        // Touching the confirmed interval is fine
        assert!(detector.confirmed_conflict(doctor, at(11, 30), at(12, 0), None).is_none());
    }

    #[test]
    fn test_patient_conflict_spans_doctors_and_skips_inactive() {
        let patient = Uuid::new_v4();
        let mut arena = HashMap::new();
        insert(&mut arena, patient, Uuid::new_v4(), at(9, 0), at(9, 30), AppointmentStatus::Canceled);
        let held = insert(&mut arena, patient, Uuid::new_v4(), at(10, 0), at(10, 30), AppointmentStatus::Scheduled);

        let detector = ConflictDetectionService::new(&arena);
        assert!(detector.patient_conflict(patient, at(9, 0), at(9, 30), None).is_none());
        assert_eq!(detector.patient_conflict(patient, at(10, 15), at(10, 45), None).map(|a| a.id), Some(held));
        assert!(detector.patient_conflict(patient, at(10, 15), at(10, 45), Some(held)).is_none());
    }

    #[test]
    fn test_cascade_targets_only_overlapping_scheduled_of_same_doctor() {
        let doctor = Uuid::new_v4();
        let mut arena = HashMap::new();
        let winner = insert(&mut arena, Uuid::new_v4(), doctor, at(10, 0), at(10, 30), AppointmentStatus::Confirmed);
        let loser = insert(&mut arena, Uuid::new_v4(), doctor, at(10, 0), at(10, 30), AppointmentStatus::Scheduled);
        insert(&mut arena, Uuid::new_v4(), doctor, at(10, 30), at(11, 0), AppointmentStatus::Scheduled);
        insert(&mut arena, Uuid::new_v4(), Uuid::new_v4(), at(10, 0), at(10, 30), AppointmentStatus::Scheduled);
        insert(&mut arena, Uuid::new_v4(), doctor, at(10, 0), at(10, 30), AppointmentStatus::Canceled);

        let detector = ConflictDetectionService::new(&arena);
        assert_eq!(detector.cascade_targets(&arena[&winner]), vec![loser]);
    }
}
