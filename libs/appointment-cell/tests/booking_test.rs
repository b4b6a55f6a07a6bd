use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::AppointmentError;
use appointment_cell::{
    AppointmentBookingService, BookAppointmentRequest, CancelAppointmentRequest,
};
use shared_models::records::AppointmentStatus;
use shared_utils::test_utils::{TestConfig, TestUser};

fn appointment_row(
    id: Uuid,
    patient_id: Uuid,
    doctor_id: Uuid,
    date: &str,
    status: &str,
) -> serde_json::Value {
    json!({
        "id": id,
        "patient_id": patient_id,
        "doctor_id": doctor_id,
        "doctor_name": "Dr. Smith",
        "patient_name": "Jane Doe",
        "date": date,
        "time": "10:00 AM",
        "status": status,
        "reason": "Checkup",
        "specialty": "Cardiologist",
        "created_at": Utc::now().to_rfc3339(),
        "updated_at": Utc::now().to_rfc3339(),
    })
}

#[tokio::test]
async fn booking_writes_a_confirmed_appointment() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let date = (Utc::now() + Duration::days(7)).date_naive();
    let date_str = date.format("%Y-%m-%d").to_string();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({
            "status": "confirmed",
            "time": "10:00 AM",
            "date": date_str,
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            appointment_row(appointment_id, patient_id, doctor_id, &date_str, "confirmed")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Patient lookup for the confirmation email.
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": patient_id, "email": "jane@example.com", "full_name": "Jane Doe" }
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    let service = AppointmentBookingService::new(&config);

    let (appointment, envelope) = service
        .book(BookAppointmentRequest {
            patient_id,
            doctor_id,
            doctor_name: "Dr. Smith".to_string(),
            patient_name: "Jane Doe".to_string(),
            date,
            time: "10:00 AM".parse().unwrap(),
            reason: Some("Checkup".to_string()),
            specialty: Some("Cardiologist".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Confirmed);
    assert_eq!(appointment.time.to_string(), "10:00 AM");
    assert_eq!(envelope.agent, "BookingAgent");
    assert_eq!(envelope.status, "success");
}

#[tokio::test]
async fn cancel_patches_the_status_and_keeps_the_record() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(appointment_id, patient_id, doctor_id, "2025-03-10", "confirmed")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(body_partial_json(json!({ "status": "cancelled" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(appointment_id, patient_id, doctor_id, "2025-03-10", "cancelled")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    let service = AppointmentBookingService::new(&config);

    // The owning patient may cancel.
    let mut user = TestUser::patient("jane@example.com").to_auth_user();
    user.id = patient_id.to_string();

    let (appointment, _) = service
        .cancel(
            appointment_id,
            CancelAppointmentRequest {
                reason: Some("Feeling better".to_string()),
            },
            &user,
        )
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn uninvolved_patients_cannot_cancel() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(appointment_id, Uuid::new_v4(), Uuid::new_v4(), "2025-03-10", "confirmed")
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    let service = AppointmentBookingService::new(&config);
    let intruder = TestUser::patient("other@example.com").to_auth_user();

    let result = service
        .cancel(appointment_id, CancelAppointmentRequest::default(), &intruder)
        .await;

    assert_matches!(result, Err(AppointmentError::NotAuthorized));
}

#[tokio::test]
async fn listing_is_scoped_to_the_caller() {
    let mock_server = MockServer::start().await;
    let patient = TestUser::patient("jane@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("patient_id", format!("eq.{}", patient.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(
                Uuid::new_v4(),
                patient.id.parse().unwrap(),
                Uuid::new_v4(),
                "2025-03-10",
                "confirmed",
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    let service = AppointmentBookingService::new(&config);

    let appointments = service.list_for(&patient.to_auth_user()).await.unwrap();
    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].patient_id.to_string(), patient.id);
}

#[tokio::test]
async fn missing_appointment_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    let service = AppointmentBookingService::new(&config);

    assert_matches!(service.get(Uuid::new_v4()).await, Err(AppointmentError::NotFound));
}
