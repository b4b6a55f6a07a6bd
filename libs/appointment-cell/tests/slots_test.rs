use std::collections::HashSet;

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::{SlotQuery, SlotService};
use shared_utils::test_utils::TestConfig;

fn doctor_row(id: Uuid, name: &str, specialty: &str) -> serde_json::Value {
    json!({
        "id": id,
        "email": "doctor@example.com",
        "full_name": name,
        "role": "doctor",
        "specialty": specialty,
    })
}

// Dates are pushed a week out so the same-day past-slot filter stays out
// of the picture unless a test wants it.
fn future_date() -> chrono::NaiveDate {
    (Utc::now() + Duration::days(7)).date_naive()
}

#[tokio::test]
async fn booked_slots_are_flagged_unavailable() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let date = future_date();
    let date_str = date.format("%Y-%m-%d").to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("role", "eq.doctor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            doctor_row(doctor_id, "Dr. Smith", "Cardiologist")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("date", format!("eq.{}", date_str)))
        .and(query_param("status", "eq.confirmed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4(), "doctor_id": doctor_id, "time": "10:00 AM", "status": "confirmed" }
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    let service = SlotService::new(&config);

    let slots = service
        .available_slots(
            &SlotQuery {
                date: Some(date),
                doctor_id: None,
                specialty: None,
            },
            Utc::now(),
        )
        .await;

    assert_eq!(slots.len(), 17);

    let unique: HashSet<_> = slots.iter().map(|s| (s.doctor_id, s.time)).collect();
    assert_eq!(unique.len(), slots.len());

    for slot in &slots {
        assert_eq!(slot.date, date);
        assert_eq!(slot.doctor_id, doctor_id);
        if slot.time.to_string() == "10:00 AM" {
            assert!(!slot.is_available);
        } else {
            assert!(slot.is_available, "slot {} should be free", slot.time);
        }
    }
}

#[tokio::test]
async fn empty_specialty_filter_falls_back_to_all_doctors() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let date = future_date();

    // The specialty-filtered query comes first and finds nobody.
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("specialty", "eq.Dermatology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("role", "eq.doctor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            doctor_row(doctor_id, "Dr. Jones", "Cardiologist")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    let service = SlotService::new(&config);

    let slots = service
        .available_slots(
            &SlotQuery {
                date: Some(date),
                doctor_id: None,
                specialty: Some("Dermatology".to_string()),
            },
            Utc::now(),
        )
        .await;

    assert_eq!(slots.len(), 17);
    assert!(slots.iter().all(|s| s.doctor_name == "Dr. Jones"));
    assert!(slots.iter().all(|s| s.is_available));
}

#[tokio::test]
async fn no_doctors_at_all_yields_the_demo_slot_set() {
    let mock_server = MockServer::start().await;
    let date = future_date();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    let service = SlotService::new(&config);

    let slots = service
        .available_slots(
            &SlotQuery {
                date: Some(date),
                doctor_id: None,
                specialty: None,
            },
            Utc::now(),
        )
        .await;

    assert_eq!(slots.len(), 10);
    assert!(slots.iter().all(|s| s.doctor_name == "Dr. Sarah Smith"));
    assert!(slots.iter().all(|s| s.doctor_id.is_nil()));
    assert!(slots.iter().all(|s| s.is_available));
}

#[tokio::test]
async fn store_failure_degrades_to_the_default_slots() {
    let mock_server = MockServer::start().await;
    let date = future_date();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    let service = SlotService::new(&config);

    let slots = service
        .available_slots(
            &SlotQuery {
                date: Some(date),
                doctor_id: None,
                specialty: None,
            },
            Utc::now(),
        )
        .await;

    assert_eq!(slots.len(), 5);
    assert_eq!(slots[0].time.to_string(), "9:00 AM");
    assert!(slots.iter().all(|s| s.is_available));
}

#[tokio::test]
async fn exhausted_today_rolls_over_to_tomorrow() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            doctor_row(doctor_id, "Dr. Smith", "Cardiologist")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    let service = SlotService::new(&config);

    // Query "today" at a simulated 11 PM: every label has passed, so the
    // generation restarts for the next calendar day with the full grid.
    let now = Utc::now()
        .date_naive()
        .and_hms_opt(23, 0, 0)
        .unwrap()
        .and_utc();

    let slots = service
        .available_slots(
            &SlotQuery {
                date: Some(now.date_naive()),
                doctor_id: None,
                specialty: None,
            },
            now,
        )
        .await;

    assert_eq!(slots.len(), 17);
    assert!(slots.iter().all(|s| s.date == now.date_naive() + Duration::days(1)));
}
