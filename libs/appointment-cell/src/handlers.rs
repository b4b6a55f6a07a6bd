use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, AutoBookRequest, BookAppointmentRequest, CancelAppointmentRequest,
    RescheduleAppointmentRequest, SlotQuery, TriggerAgentsRequest,
};
use crate::services::auto::AutoBookingService;
use crate::services::booking::AppointmentBookingService;
use crate::services::slots::SlotService;

fn map_appointment_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::NotAuthorized => {
            AppError::Forbidden("Not authorized for this appointment".to_string())
        }
        AppointmentError::Database(msg) => AppError::Database(msg),
    }
}

/// Continuous half-hour slots for a date/doctor/specialty, with booked
/// slots flagged. Infallible by design.
#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<SlotQuery>,
    Extension(_user): Extension<AuthUser>,
) -> Json<Value> {
    let service = SlotService::new(&state);
    let slots = service.available_slots(&query, Utc::now()).await;
    Json(json!(slots))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    // Patients can only book for themselves
    if user.is_patient() && request.patient_id.to_string() != user.id {
        return Err(AppError::Forbidden(
            "Cannot book appointments for other users".to_string(),
        ));
    }

    let service = AppointmentBookingService::new(&state);
    let (appointment, _) = service.book(request).await.map_err(map_appointment_error)?;

    Ok(Json(json!({
        "message": "Appointment booked successfully",
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn get_appointments(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointments = service.list_for(&user).await.map_err(map_appointment_error)?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let (appointment, _) = service
        .reschedule(appointment_id, request, &user)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "message": "Appointment rescheduled successfully",
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let (appointment, _) = service
        .cancel(appointment_id, request, &user)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "message": "Appointment cancelled successfully",
        "appointment_id": appointment.id,
    })))
}

#[axum::debug_handler]
pub async fn auto_book_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<AutoBookRequest>,
) -> Result<Json<Value>, AppError> {
    if user.is_patient() && request.patient_id.to_string() != user.id {
        return Err(AppError::Forbidden(
            "Cannot book appointments for other users".to_string(),
        ));
    }

    let service = AutoBookingService::new(&state);
    let response = service
        .auto_book(request, &user)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn trigger_agents(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<TriggerAgentsRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AutoBookingService::new(&state);
    let response = service
        .trigger_agents(appointment_id, request, &user)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(response))
}
