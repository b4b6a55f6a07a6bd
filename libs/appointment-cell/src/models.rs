use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::time::SlotTime;

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub patient_name: String,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub reason: Option<String>,
    pub specialty: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_date: NaiveDate,
    pub new_time: SlotTime,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotQuery {
    pub date: Option<NaiveDate>,
    pub doctor_id: Option<Uuid>,
    pub specialty: Option<String>,
}

/// A derived, never-persisted slot record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub date: NaiveDate,
    pub time: SlotTime,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub specialty: Option<String>,
    pub is_available: bool,
}

// ==============================================================================
// AUTOMATIC BOOKING MODELS
// ==============================================================================

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutoBookRequest {
    pub patient_id: Uuid,
    pub patient_name: String,
    pub preferred_date: Option<NaiveDate>,
    pub preferred_time: Option<SlotTime>,
    pub reason: Option<String>,
    pub preferred_specialty: Option<String>,
    #[serde(default = "default_true")]
    pub auto_schedule_reminders: bool,
    #[serde(default = "default_true")]
    pub auto_send_questionnaire: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerOperation {
    Reminder,
    Questionnaire,
}

impl fmt::Display for TriggerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerOperation::Reminder => write!(f, "reminder"),
            TriggerOperation::Questionnaire => write!(f, "questionnaire"),
        }
    }
}

fn default_operations() -> Vec<TriggerOperation> {
    vec![TriggerOperation::Reminder, TriggerOperation::Questionnaire]
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerAgentsRequest {
    #[serde(default = "default_operations")]
    pub operations: Vec<TriggerOperation>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Not authorized for this appointment")]
    NotAuthorized,

    #[error("Database error: {0}")]
    Database(String),
}
