// libs/appointment-cell/tests/handlers_test.rs
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::router::{appointment_routes, calendar_routes};
use appointment_cell::services::SchedulingService;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

struct TestApp {
    router: Router,
    scheduler: Arc<SchedulingService>,
    secret: String,
}

impl TestApp {
    fn new() -> Self {
        let config = TestConfig::default();
        let scheduler = Arc::new(SchedulingService::new());
        let router = Router::new()
            .nest("/appointments", appointment_routes(config.to_arc(), scheduler.clone()))
            .nest("/doctors", calendar_routes(config.to_arc(), scheduler.clone()));

        Self {
            router,
            scheduler,
            secret: config.jwt_secret,
        }
    }

    async fn call(&self, method: &str, uri: &str, user: Option<&TestUser>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("Authorization", JwtTestUtils::bearer(user, &self.secret));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

fn at(hour: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2099, 1, 5, 0, 0, 0).unwrap() + Duration::hours(hour)
}

async fn publish(app: &TestApp, doctor: &TestUser, hour: i64) {
    let (status, _) = app
        .call(
            "POST",
            &format!("/doctors/{}/slots", doctor.id),
            Some(doctor),
            Some(json!({ "start": at(hour), "end": at(hour) + Duration::minutes(30) })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

async fn book(app: &TestApp, patient: &TestUser, doctor: &TestUser, hour: i64) -> (StatusCode, Value) {
    app.call(
        "POST",
        "/appointments",
        Some(patient),
        Some(json!({
            "patient_id": patient.id,
            "doctor_id": doctor.id,
            "start": at(hour),
            "end": at(hour) + Duration::minutes(30)
        })),
    )
    .await
}

fn appointment_id(body: &Value) -> String {
    body["appointment"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_requests_without_token_are_unauthorized() {
    let app = TestApp::new();

    let (status, body) = app.call("GET", "/appointments", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("Missing authorization header"));

    let (status, _) = app
        .call(
            "POST",
            &format!("/doctors/{}/slots", Uuid::new_v4()),
            None,
            Some(json!({ "start": at(10), "end": at(11) })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.call("GET", &format!("/doctors/{}/calendar", Uuid::new_v4()), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_slot_listing_is_public() {
    let app = TestApp::new();
    let doctor = TestUser::doctor("doc@example.com");
    publish(&app, &doctor, 10).await;

    let (status, body) = app
        .call("GET", &format!("/doctors/{}/slots", doctor.id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["doctor_id"], doctor.id.as_str());
}

#[tokio::test]
async fn test_doctor_publishes_and_patient_books() {
    let app = TestApp::new();
    let doctor = TestUser::doctor("doc@example.com");
    let patient = TestUser::patient("pat@example.com");

    publish(&app, &doctor, 10).await;

    let (status, body) = app
        .call("GET", &format!("/doctors/{}/slots", doctor.id), Some(&patient), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, body) = book(&app, &patient, &doctor, 10).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["appointment"]["status"], "scheduled");
    assert_eq!(body["appointment"]["patient_id"], patient.id.as_str());
}

#[tokio::test]
async fn test_calendar_management_is_restricted_to_owner() {
    let app = TestApp::new();
    let doctor = TestUser::doctor("doc@example.com");
    let other_doctor = TestUser::doctor("other@example.com");
    let admin = TestUser::admin("admin@example.com");

    let (status, _) = app
        .call(
            "POST",
            &format!("/doctors/{}/slots", doctor.id),
            Some(&other_doctor),
            Some(json!({ "start": at(10), "end": at(11) })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            "POST",
            &format!("/doctors/{}/slots", doctor.id),
            Some(&admin),
            Some(json!({ "start": at(12), "end": at(13), "blocked": true })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["interval"]["blocked"], true);
    assert_eq!(body["slots"].as_array().unwrap().len(), 0);

    let (status, body) = app
        .call("GET", &format!("/doctors/{}/calendar", doctor.id), Some(&doctor), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["intervals"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .call(
            "POST",
            &format!("/doctors/{}/slots/unblock", doctor.id),
            Some(&doctor),
            Some(json!({ "start": at(12), "end": at(13) })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], true);
}

#[tokio::test]
async fn test_overlapping_publication_is_conflict_and_inverted_is_bad_request() {
    let app = TestApp::new();
    let doctor = TestUser::doctor("doc@example.com");
    publish(&app, &doctor, 10).await;

    let uri = format!("/doctors/{}/slots", doctor.id);
    let (status, _) = app
        .call("POST", &uri, Some(&doctor), Some(json!({ "start": at(10), "end": at(11) })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .call("POST", &uri, Some(&doctor), Some(json!({ "start": at(15), "end": at(14) })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patient_cannot_book_for_someone_else() {
    let app = TestApp::new();
    let doctor = TestUser::doctor("doc@example.com");
    let patient = TestUser::patient("pat@example.com");
    let intruder = TestUser::patient("intruder@example.com");
    publish(&app, &doctor, 10).await;

    let (status, _) = app
        .call(
            "POST",
            "/appointments",
            Some(&intruder),
            Some(json!({
                "patient_id": patient.id,
                "doctor_id": doctor.id,
                "start": at(10),
                "end": at(10) + Duration::minutes(30)
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_booking_unpublished_slot_is_conflict() {
    let app = TestApp::new();
    let doctor = TestUser::doctor("doc@example.com");
    let patient = TestUser::patient("pat@example.com");

    let (status, body) = book(&app, &patient, &doctor, 10).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Slot unavailable"));
}

#[tokio::test]
async fn test_only_the_doctor_confirms_and_cascade_cancels_competitor() {
    let app = TestApp::new();
    let doctor = TestUser::doctor("doc@example.com");
    let first = TestUser::patient("first@example.com");
    let second = TestUser::patient("second@example.com");
    publish(&app, &doctor, 10).await;

    let (_, body) = book(&app, &first, &doctor, 10).await;
    let first_id = appointment_id(&body);
    let (_, body) = book(&app, &second, &doctor, 10).await;
    let second_id = appointment_id(&body);

    let (status, _) = app
        .call("POST", &format!("/appointments/{}/confirm", first_id), Some(&first), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call("POST", &format!("/appointments/{}/confirm", first_id), Some(&doctor), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["status"], "confirmed");

    let (status, body) = app
        .call("GET", &format!("/appointments/{}", second_id), Some(&second), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "canceled");

    let (status, _) = app
        .call("POST", &format!("/appointments/{}/confirm", first_id), Some(&doctor), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_appointment_visibility() {
    let app = TestApp::new();
    let doctor = TestUser::doctor("doc@example.com");
    let patient = TestUser::patient("pat@example.com");
    let stranger = TestUser::patient("stranger@example.com");
    let admin = TestUser::admin("admin@example.com");
    publish(&app, &doctor, 10).await;
    let (_, body) = book(&app, &patient, &doctor, 10).await;
    let id = appointment_id(&body);

    let uri = format!("/appointments/{}", id);
    assert_eq!(app.call("GET", &uri, Some(&stranger), None).await.0, StatusCode::FORBIDDEN);
    assert_eq!(app.call("GET", &uri, Some(&doctor), None).await.0, StatusCode::OK);
    assert_eq!(app.call("GET", &uri, Some(&admin), None).await.0, StatusCode::OK);

    let (status, _) = app
        .call("GET", &format!("/appointments/{}", Uuid::new_v4()), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Listing is pinned to the caller's own records
    let (_, body) = app.call("GET", "/appointments", Some(&stranger), None).await;
    assert_eq!(body["total"], 0);
    let (_, body) = app
        .call("GET", &format!("/appointments?patient_id={}", patient.id), Some(&stranger), None)
        .await;
    assert_eq!(body["total"], 0);
    let (_, body) = app.call("GET", "/appointments?status=scheduled", Some(&admin), None).await;
    assert_eq!(body["total"], 1);

    let (status, body) = app
        .call("GET", &format!("/appointments/patients/{}", patient.id), Some(&patient), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    let (status, _) = app
        .call("GET", &format!("/appointments/doctors/{}", doctor.id), Some(&patient), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cancel_note_and_complete_flow() {
    let app = TestApp::new();
    let doctor = TestUser::doctor("doc@example.com");
    let patient = TestUser::patient("pat@example.com");
    publish(&app, &doctor, 10).await;
    let (_, body) = book(&app, &patient, &doctor, 10).await;
    let id = appointment_id(&body);

    let (status, body) = app
        .call(
            "PUT",
            &format!("/appointments/{}/note", id),
            Some(&patient),
            Some(json!({ "note": "  allergic to penicillin  " })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["note"], "allergic to penicillin");

    // Not confirmed yet
    let (status, _) = app
        .call("POST", &format!("/appointments/{}/complete", id), Some(&doctor), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .call("POST", &format!("/appointments/{}/cancel", id), Some(&patient), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["status"], "canceled");

    let (status, _) = app
        .call("POST", &format!("/appointments/{}/cancel", id), Some(&patient), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_reschedule_by_doctor_confirms_new_appointment() {
    let app = TestApp::new();
    let doctor = TestUser::doctor("doc@example.com");
    let patient = TestUser::patient("pat@example.com");
    publish(&app, &doctor, 10).await;
    publish(&app, &doctor, 14).await;
    let (_, body) = book(&app, &patient, &doctor, 10).await;
    let id = appointment_id(&body);

    let (status, body) = app
        .call(
            "POST",
            &format!("/appointments/{}/reschedule", id),
            Some(&doctor),
            Some(json!({ "new_start": at(14), "new_end": at(14) + Duration::minutes(30) })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["status"], "confirmed");
    assert_eq!(body["previous_appointment_id"], id.as_str());

    let history = app.scheduler.patient_history(patient.uuid()).await;
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn test_reschedule_by_patient_keeps_new_appointment_scheduled() {
    let app = TestApp::new();
    let doctor = TestUser::doctor("doc@example.com");
    let patient = TestUser::patient("pat@example.com");
    publish(&app, &doctor, 10).await;
    publish(&app, &doctor, 14).await;
    let (_, body) = book(&app, &patient, &doctor, 10).await;
    let id = appointment_id(&body);

    let (status, body) = app
        .call(
            "POST",
            &format!("/appointments/{}/reschedule", id),
            Some(&patient),
            Some(json!({ "new_start": at(14), "new_end": at(14) + Duration::minutes(30) })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["status"], "scheduled");
}
