use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use agent_cell::{AgentDispatcher, AgentEnvelope, AgentIntent};
use notification_cell::models::EmailDetails;
use notification_cell::{ContentService, EmailService};
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::AuthUser;
use shared_models::records::{Reminder, ReminderStatus};
use shared_models::time::SlotTime;

use crate::models::{ReminderError, ReminderLogsQuery, ScheduleReminderRequest, SendReminderRequest};

/// Compute a reminder's absolute fire instant: the appointment instant
/// (UTC) minus the lead hours. The date/time arrive as stored strings; any
/// parse failure degrades to "fire immediately" so a reminder record is
/// always created.
pub fn fire_time(
    date_str: &str,
    time_label: &str,
    hours_before: i64,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let instant = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .ok()
        .zip(time_label.parse::<SlotTime>().ok())
        .map(|(date, time)| date.and_time(time.as_time()).and_utc());

    match instant {
        Some(at) => at - Duration::hours(hours_before),
        None => {
            warn!(
                "Could not parse appointment instant from {:?} {:?}, scheduling immediately",
                date_str, time_label
            );
            now
        }
    }
}

pub struct ReminderSchedulerService {
    store: SupabaseClient,
    agents: AgentDispatcher,
    content: ContentService,
    mailer: EmailService,
}

impl ReminderSchedulerService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: SupabaseClient::new(config),
            agents: AgentDispatcher::from_config(config),
            content: ContentService::new(config),
            mailer: EmailService::new(config),
        }
    }

    /// Schedule a reminder for an appointment. When the computed fire time
    /// has already passed, delivery happens right away and the record is
    /// conditionally marked sent.
    pub async fn schedule(
        &self,
        request: ScheduleReminderRequest,
        user: &AuthUser,
    ) -> Result<(Reminder, AgentEnvelope), ReminderError> {
        let appointment = self.fetch_appointment(request.appointment_id).await?;
        authorize_for_appointment(user, &appointment)?;

        let date = appointment["date"].as_str().unwrap_or_default().to_string();
        let time = appointment["time"].as_str().unwrap_or_default().to_string();

        let task = format!(
            "Schedule a {} reminder for appointment on {} at {}, {} hours before",
            request.channel, date, time, request.hours_before
        );
        let context = json!({
            "action": "schedule_reminder",
            "appointment_id": request.appointment_id,
            "patient_name": appointment["patient_name"],
            "doctor_name": appointment["doctor_name"],
            "appointment_date": date,
            "appointment_time": time,
            "reminder_type": request.channel,
            "hours_before": request.hours_before,
        });
        let envelope = self
            .agents
            .dispatch(AgentIntent::ScheduleReminder, &task, context)
            .await;

        let now = Utc::now();
        let scheduled_at = fire_time(&date, &time, request.hours_before, now);

        let row = json!({
            "appointment_id": request.appointment_id,
            "patient_id": appointment["patient_id"],
            "doctor_id": appointment["doctor_id"],
            "channel": request.channel,
            "hours_before": request.hours_before,
            "status": ReminderStatus::Scheduled,
            "scheduled_at": scheduled_at.to_rfc3339(),
            "appointment_date": date,
            "appointment_time": time,
            "created_by": user.id,
            "created_at": now.to_rfc3339(),
        });

        let inserted = self
            .store
            .insert_returning("reminders", row)
            .await
            .map_err(|e| ReminderError::Database(e.to_string()))?;
        let mut reminder: Reminder = inserted
            .into_iter()
            .next()
            .ok_or_else(|| ReminderError::Database("Failed to create reminder".to_string()))
            .and_then(|value| {
                serde_json::from_value(value)
                    .map_err(|e| ReminderError::Database(format!("Failed to parse reminder: {}", e)))
            })?;

        info!("Reminder scheduled: {}", reminder.id);

        // Already due: deliver now instead of waiting for the next poll.
        if scheduled_at <= now {
            if self.deliver(&appointment).await {
                if self.mark_sent(reminder.id, now).await {
                    reminder.status = ReminderStatus::Sent;
                    reminder.sent_at = Some(now);
                }
            }
        }

        Ok((reminder, envelope))
    }

    /// Immediate-send path: bypasses the scheduled-fire mechanism, sends
    /// synchronously and records the reminder as already sent.
    pub async fn send_immediate(
        &self,
        request: SendReminderRequest,
        user: &AuthUser,
    ) -> Result<(Reminder, AgentEnvelope), ReminderError> {
        let appointment = self.fetch_appointment(request.appointment_id).await?;
        authorize_for_appointment(user, &appointment)?;

        let date = appointment["date"].as_str().unwrap_or_default().to_string();
        let time = appointment["time"].as_str().unwrap_or_default().to_string();

        let task = format!(
            "Send immediate {} reminder for appointment on {} at {}",
            request.channel, date, time
        );
        let context = json!({
            "action": "send_immediate",
            "appointment_id": request.appointment_id,
            "patient_name": appointment["patient_name"],
            "doctor_name": appointment["doctor_name"],
            "appointment_date": date,
            "appointment_time": time,
            "reminder_type": request.channel,
        });
        let envelope = self
            .agents
            .dispatch(AgentIntent::SendImmediate, &task, context)
            .await;

        if !self.deliver(&appointment).await {
            warn!(
                "Immediate reminder delivery failed for appointment {}",
                request.appointment_id
            );
        }

        let now = Utc::now();
        let row = json!({
            "appointment_id": request.appointment_id,
            "patient_id": appointment["patient_id"],
            "doctor_id": appointment["doctor_id"],
            "channel": request.channel,
            "hours_before": 0,
            "status": ReminderStatus::Sent,
            "scheduled_at": now.to_rfc3339(),
            "sent_at": now.to_rfc3339(),
            "appointment_date": date,
            "appointment_time": time,
            "created_by": user.id,
            "created_at": now.to_rfc3339(),
        });

        let inserted = self
            .store
            .insert_returning("reminders", row)
            .await
            .map_err(|e| ReminderError::Database(e.to_string()))?;
        let reminder: Reminder = inserted
            .into_iter()
            .next()
            .ok_or_else(|| ReminderError::Database("Failed to create reminder".to_string()))
            .and_then(|value| {
                serde_json::from_value(value)
                    .map_err(|e| ReminderError::Database(format!("Failed to parse reminder: {}", e)))
            })?;

        info!("Immediate reminder sent: {}", reminder.id);
        Ok((reminder, envelope))
    }

    /// Reminder history, scoped by role: patients and doctors see their
    /// own, admins see everything.
    pub async fn logs(
        &self,
        query: ReminderLogsQuery,
        user: &AuthUser,
    ) -> Result<Vec<Reminder>, ReminderError> {
        let mut path = "/rest/v1/reminders?".to_string();

        if let Some(appointment_id) = query.appointment_id {
            path.push_str(&format!("appointment_id=eq.{}&", appointment_id));
        } else if user.is_doctor() {
            path.push_str(&format!("doctor_id=eq.{}&", user.id));
        } else if !user.is_admin() {
            path.push_str(&format!("patient_id=eq.{}&", user.id));
        }

        path.push_str("order=scheduled_at.desc&limit=50");

        let rows: Vec<Value> = self
            .store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| ReminderError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| ReminderError::Database(format!("Failed to parse reminder: {}", e)))
            })
            .collect()
    }

    async fn fetch_appointment(&self, appointment_id: Uuid) -> Result<Value, ReminderError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| ReminderError::Database(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or(ReminderError::AppointmentNotFound)
    }

    /// Generate and deliver the reminder email for an appointment row.
    /// Missing contact data is not an error; it just skips delivery.
    async fn deliver(&self, appointment: &Value) -> bool {
        let patient_id = appointment["patient_id"].as_str().unwrap_or_default();

        let patient_email = match self.lookup_user(patient_id).await {
            Some(patient) => patient["email"].as_str().unwrap_or_default().to_string(),
            None => String::new(),
        };
        if patient_email.is_empty() {
            warn!("No patient email on file, reminder not delivered");
            return false;
        }

        let details = EmailDetails {
            patient_name: appointment["patient_name"]
                .as_str()
                .filter(|s| !s.is_empty())
                .unwrap_or("Patient")
                .to_string(),
            doctor_name: appointment["doctor_name"]
                .as_str()
                .filter(|s| !s.is_empty())
                .unwrap_or("Doctor")
                .to_string(),
            specialty: appointment["specialty"]
                .as_str()
                .filter(|s| !s.is_empty())
                .unwrap_or("General")
                .to_string(),
            appointment_date: appointment["date"].as_str().unwrap_or_default().to_string(),
            appointment_time: appointment["time"].as_str().unwrap_or_default().to_string(),
            reason: appointment["reason"].as_str().map(str::to_string),
            questionnaire_required: false,
        };

        let content = self.content.reminder_email(&details).await;
        self.mailer
            .send(&patient_email, &content.subject, &content.body, None)
            .await
    }

    async fn lookup_user(&self, user_id: &str) -> Option<Value> {
        if user_id.is_empty() {
            return None;
        }

        let path = format!("/rest/v1/users?id=eq.{}", user_id);
        match self.store.request::<Vec<Value>>(Method::GET, &path, None).await {
            Ok(mut rows) if !rows.is_empty() => Some(rows.remove(0)),
            Ok(_) => None,
            Err(e) => {
                warn!("Could not fetch user {}: {}", user_id, e);
                None
            }
        }
    }

    async fn mark_sent(&self, reminder_id: Uuid, now: DateTime<Utc>) -> bool {
        let filter = format!("id=eq.{}&status=eq.scheduled", reminder_id);
        let patch = json!({
            "status": ReminderStatus::Sent,
            "sent_at": now.to_rfc3339(),
        });

        match self.store.update_returning("reminders", &filter, patch).await {
            Ok(rows) => !rows.is_empty(),
            Err(e) => {
                error!("Failed to mark reminder {} sent: {}", reminder_id, e);
                false
            }
        }
    }
}

fn authorize_for_appointment(user: &AuthUser, appointment: &Value) -> Result<(), ReminderError> {
    if user.is_doctor() || user.is_admin() {
        return Ok(());
    }
    if appointment["patient_id"].as_str() == Some(user.id.as_str()) {
        return Ok(());
    }
    Err(ReminderError::NotAuthorized)
}
