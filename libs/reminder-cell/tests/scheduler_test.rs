use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reminder_cell::models::{ReminderError, ScheduleReminderRequest, SendReminderRequest};
use reminder_cell::ReminderSchedulerService;
use shared_models::records::{ReminderChannel, ReminderStatus};
use shared_utils::test_utils::{TestConfig, TestUser};

fn appointment_row(
    appointment_id: Uuid,
    patient_id: Uuid,
    doctor_id: Uuid,
    date: &str,
) -> serde_json::Value {
    json!({
        "id": appointment_id,
        "patient_id": patient_id,
        "doctor_id": doctor_id,
        "doctor_name": "Dr. Smith",
        "patient_name": "Jane Doe",
        "date": date,
        "time": "10:00 AM",
        "status": "confirmed",
        "reason": "Checkup",
        "specialty": "Cardiologist",
        "created_at": Utc::now().to_rfc3339(),
        "updated_at": Utc::now().to_rfc3339(),
    })
}

fn stored_reminder(
    appointment_id: Uuid,
    patient_id: Uuid,
    doctor_id: Uuid,
    status: &str,
    scheduled_at: chrono::DateTime<Utc>,
    date: &str,
) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "appointment_id": appointment_id,
        "patient_id": patient_id,
        "doctor_id": doctor_id,
        "channel": "email",
        "hours_before": 24,
        "status": status,
        "scheduled_at": scheduled_at.to_rfc3339(),
        "sent_at": null,
        "appointment_date": date,
        "appointment_time": "10:00 AM",
        "created_by": patient_id,
        "created_at": Utc::now().to_rfc3339(),
    })
}

#[tokio::test]
async fn schedules_a_reminder_at_appointment_minus_lead_hours() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    // A future appointment so the immediate-delivery branch stays cold.
    let date = (Utc::now() + Duration::days(30)).date_naive();
    let date_str = date.format("%Y-%m-%d").to_string();
    let expected_fire = date.and_hms_opt(10, 0, 0).unwrap().and_utc() - Duration::hours(24);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(appointment_id, patient_id, doctor_id, &date_str)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/reminders"))
        .and(body_partial_json(json!({
            "status": "scheduled",
            "hours_before": 24,
            "scheduled_at": expected_fire.to_rfc3339(),
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            stored_reminder(appointment_id, patient_id, doctor_id, "scheduled", expected_fire, &date_str)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    let service = ReminderSchedulerService::new(&config);
    let user = TestUser::admin("admin@example.com").to_auth_user();

    let (reminder, envelope) = service
        .schedule(
            ScheduleReminderRequest {
                appointment_id,
                channel: ReminderChannel::Email,
                hours_before: 24,
            },
            &user,
        )
        .await
        .unwrap();

    assert_eq!(reminder.status, ReminderStatus::Scheduled);
    assert_eq!(reminder.scheduled_at, expected_fire);
    assert_eq!(envelope.agent, "ReminderAgent");
    assert_eq!(envelope.status, "success");
}

#[tokio::test]
async fn past_due_schedule_delivers_and_latches_immediately() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let fire = Utc::now() - Duration::hours(1);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(appointment_id, patient_id, doctor_id, "2025-03-10")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": patient_id, "email": "jane@example.com", "full_name": "Jane Doe" }
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/reminders"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            stored_reminder(appointment_id, patient_id, doctor_id, "scheduled", fire, "2025-03-10")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/reminders"))
        .and(query_param("status", "eq.scheduled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            stored_reminder(appointment_id, patient_id, doctor_id, "sent", fire, "2025-03-10")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    let service = ReminderSchedulerService::new(&config);
    let user = TestUser::doctor("doc@example.com").to_auth_user();

    let (reminder, _) = service
        .schedule(
            ScheduleReminderRequest {
                appointment_id,
                channel: ReminderChannel::Email,
                hours_before: 24,
            },
            &user,
        )
        .await
        .unwrap();

    assert_eq!(reminder.status, ReminderStatus::Sent);
    assert!(reminder.sent_at.is_some());
}

#[tokio::test]
async fn immediate_send_records_a_sent_reminder() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let now = Utc::now();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(appointment_id, patient_id, doctor_id, "2025-03-10")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": patient_id, "email": "jane@example.com", "full_name": "Jane Doe" }
        ])))
        .mount(&mock_server)
        .await;

    let mut sent_row = stored_reminder(appointment_id, patient_id, doctor_id, "sent", now, "2025-03-10");
    sent_row["sent_at"] = json!(now.to_rfc3339());

    Mock::given(method("POST"))
        .and(path("/rest/v1/reminders"))
        .and(body_partial_json(json!({ "status": "sent" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([sent_row])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    let service = ReminderSchedulerService::new(&config);
    let user = TestUser::admin("admin@example.com").to_auth_user();

    let (reminder, envelope) = service
        .send_immediate(
            SendReminderRequest {
                appointment_id,
                channel: ReminderChannel::Email,
            },
            &user,
        )
        .await
        .unwrap();

    assert_eq!(reminder.status, ReminderStatus::Sent);
    assert!(reminder.sent_at.is_some());
    assert_eq!(envelope.agent, "ReminderAgent");
}

#[tokio::test]
async fn other_patients_cannot_schedule_reminders() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(appointment_id, Uuid::new_v4(), Uuid::new_v4(), "2025-03-10")
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    let service = ReminderSchedulerService::new(&config);
    let intruder = TestUser::patient("other@example.com").to_auth_user();

    let result = service
        .schedule(
            ScheduleReminderRequest {
                appointment_id,
                channel: ReminderChannel::Email,
                hours_before: 24,
            },
            &intruder,
        )
        .await;

    assert_matches!(result, Err(ReminderError::NotAuthorized));
}

#[tokio::test]
async fn missing_appointment_is_a_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    let service = ReminderSchedulerService::new(&config);
    let user = TestUser::admin("admin@example.com").to_auth_user();

    let result = service
        .send_immediate(
            SendReminderRequest {
                appointment_id: Uuid::new_v4(),
                channel: ReminderChannel::Email,
            },
            &user,
        )
        .await;

    assert_matches!(result, Err(ReminderError::AppointmentNotFound));
}
