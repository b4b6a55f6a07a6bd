use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::SlotTime;

// ==============================================================================
// USERS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Patient,
    Doctor,
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Patient => write!(f, "patient"),
            UserRole::Doctor => write!(f, "doctor"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(UserRole::Patient),
            "doctor" => Ok(UserRole::Doctor),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub patient_name: String,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub specialty: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// The appointment instant in the fixed reference time zone (UTC).
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.date.and_time(self.time.as_time()).and_utc()
    }
}

// ==============================================================================
// REMINDERS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReminderChannel {
    Email,
    Sms,
}

impl fmt::Display for ReminderChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderChannel::Email => write!(f, "email"),
            ReminderChannel::Sms => write!(f, "sms"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Scheduled,
    Sent,
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderStatus::Scheduled => write!(f, "scheduled"),
            ReminderStatus::Sent => write!(f, "sent"),
        }
    }
}

/// A reminder row. The appointment date/time snapshots are kept as the raw
/// stored strings: they exist for display in the outgoing email, and a
/// malformed label must degrade the fire-time computation rather than make
/// the record unreadable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub channel: ReminderChannel,
    pub hours_before: i64,
    pub status: ReminderStatus,
    pub scheduled_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub appointment_date: String,
    pub appointment_time: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

// ==============================================================================
// QUESTIONNAIRES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Questionnaire {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub chief_complaint: Option<String>,
    pub symptoms: Option<String>,
    pub medical_history: Option<String>,
    pub current_medications: Option<String>,
    pub allergies: Option<String>,
    pub additional_notes: Option<String>,
    pub summary: Option<String>,
    pub submitted_at: DateTime<Utc>,
}
