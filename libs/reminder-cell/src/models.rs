use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use shared_models::records::ReminderChannel;

fn default_channel() -> ReminderChannel {
    ReminderChannel::Email
}

fn default_hours_before() -> i64 {
    24
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleReminderRequest {
    pub appointment_id: Uuid,
    #[serde(default = "default_channel")]
    pub channel: ReminderChannel,
    #[serde(default = "default_hours_before")]
    pub hours_before: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendReminderRequest {
    pub appointment_id: Uuid,
    #[serde(default = "default_channel")]
    pub channel: ReminderChannel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReminderLogsQuery {
    pub appointment_id: Option<Uuid>,
}

#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Not authorized for this appointment's reminders")]
    NotAuthorized,

    #[error("Database error: {0}")]
    Database(String),
}
