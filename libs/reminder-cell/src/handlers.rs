use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{ReminderError, ReminderLogsQuery, ScheduleReminderRequest, SendReminderRequest};
use crate::services::scheduler::ReminderSchedulerService;

fn map_reminder_error(e: ReminderError) -> AppError {
    match e {
        ReminderError::AppointmentNotFound => AppError::NotFound("Appointment not found".to_string()),
        ReminderError::NotAuthorized => {
            AppError::Forbidden("Not authorized to manage reminders for this appointment".to_string())
        }
        ReminderError::Database(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn schedule_reminder(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ScheduleReminderRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ReminderSchedulerService::new(&state);

    let (reminder, agent_result) = service
        .schedule(request, &user)
        .await
        .map_err(map_reminder_error)?;

    Ok(Json(json!({
        "message": "Reminder scheduled successfully",
        "reminder": reminder,
        "agent_result": agent_result,
    })))
}

#[axum::debug_handler]
pub async fn send_reminder(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<SendReminderRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ReminderSchedulerService::new(&state);

    let (reminder, agent_result) = service
        .send_immediate(request, &user)
        .await
        .map_err(map_reminder_error)?;

    Ok(Json(json!({
        "message": "Reminder sent successfully",
        "reminder": reminder,
        "agent_result": agent_result,
    })))
}

#[axum::debug_handler]
pub async fn get_reminder_logs(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<ReminderLogsQuery>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = ReminderSchedulerService::new(&state);

    let reminders = service.logs(query, &user).await.map_err(map_reminder_error)?;
    let count = reminders.len();

    Ok(Json(json!({
        "reminders": reminders,
        "count": count,
    })))
}
