use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use notification_cell::models::EmailDetails;
use notification_cell::{ContentService, EmailService};
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::records::{Reminder, ReminderStatus};

/// The background poller: every interval it scans a bounded page of
/// `scheduled` reminders, sends the due ones by email, and latches their
/// status to `sent` with a conditional update. Per-record failures are
/// logged and left for the next cycle; the loop itself never exits.
pub struct ReminderDispatchService {
    store: SupabaseClient,
    content: ContentService,
    mailer: EmailService,
    poll_interval: Duration,
    batch_size: i64,
}

impl ReminderDispatchService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: SupabaseClient::new(config),
            content: ContentService::new(config),
            mailer: EmailService::new(config),
            poll_interval: Duration::from_secs(config.reminder_poll_seconds),
            batch_size: config.reminder_batch_size,
        }
    }

    pub async fn run(self) {
        info!(
            "Reminder dispatch loop started (interval {}s, batch {})",
            self.poll_interval.as_secs(),
            self.batch_size
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            interval.tick().await;

            let sent = self.poll_cycle(Utc::now()).await;
            if sent > 0 {
                info!("Dispatched {} due reminder(s)", sent);
            }
        }
    }

    /// One scan cycle. Returns how many reminders were actually sent.
    pub async fn poll_cycle(&self, now: DateTime<Utc>) -> usize {
        let reminders = match self.fetch_scheduled().await {
            Ok(reminders) => reminders,
            Err(e) => {
                warn!("Reminder sender loop error: {}", e);
                return 0;
            }
        };

        let mut sent = 0;
        for reminder in reminders {
            // The store filters on status only; due-ness is checked here.
            if reminder.scheduled_at > now {
                continue;
            }

            match self.dispatch_one(&reminder, now).await {
                Ok(true) => sent += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("Reminder send check failed for {}: {}", reminder.id, e);
                }
            }
        }

        sent
    }

    async fn fetch_scheduled(&self) -> anyhow::Result<Vec<Reminder>> {
        let path = format!(
            "/rest/v1/reminders?status=eq.scheduled&limit={}",
            self.batch_size
        );
        let rows: Vec<Value> = self.store.request(Method::GET, &path, None).await?;

        let mut reminders = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<Reminder>(row) {
                Ok(reminder) => reminders.push(reminder),
                Err(e) => warn!("Skipping unreadable reminder row: {}", e),
            }
        }

        Ok(reminders)
    }

    async fn dispatch_one(&self, reminder: &Reminder, now: DateTime<Utc>) -> anyhow::Result<bool> {
        // Display data degrades to placeholders; only a missing email
        // blocks delivery (the record stays scheduled for a later retry).
        let mut patient_email = String::new();
        let mut patient_name = "Patient".to_string();
        let mut doctor_name = "Doctor".to_string();
        let mut specialty = "General".to_string();

        if let Some(patient) = self.lookup_user(reminder.patient_id).await {
            if let Some(email) = patient["email"].as_str() {
                patient_email = email.to_string();
            }
            if let Some(name) = patient["full_name"].as_str().filter(|s| !s.is_empty()) {
                patient_name = name.to_string();
            }
        }
        if let Some(doctor) = self.lookup_user(reminder.doctor_id).await {
            if let Some(name) = doctor["full_name"].as_str().filter(|s| !s.is_empty()) {
                doctor_name = name.to_string();
            }
            if let Some(s) = doctor["specialty"].as_str().filter(|s| !s.is_empty()) {
                specialty = s.to_string();
            }
        }

        if patient_email.is_empty() {
            debug!("Reminder {} has no patient email yet, leaving scheduled", reminder.id);
            return Ok(false);
        }

        let details = EmailDetails {
            patient_name,
            doctor_name,
            specialty,
            appointment_date: reminder.appointment_date.clone(),
            appointment_time: reminder.appointment_time.clone(),
            reason: None,
            questionnaire_required: false,
        };
        let content = self.content.reminder_email(&details).await;

        if !self
            .mailer
            .send(&patient_email, &content.subject, &content.body, None)
            .await
        {
            return Err(anyhow::anyhow!("delivery failed"));
        }

        if !self.mark_sent(reminder.id, now).await? {
            // Another sender latched the record first; nothing to re-send.
            debug!("Reminder {} was already sent, skipping", reminder.id);
            return Ok(false);
        }

        info!(
            "Reminder sent to {} for {} {}",
            patient_email, reminder.appointment_date, reminder.appointment_time
        );
        Ok(true)
    }

    /// Latch scheduled -> sent. The filter on the current status makes the
    /// update conditional: an empty representation means the reminder was
    /// no longer `scheduled` and must not be re-sent.
    pub async fn mark_sent(&self, reminder_id: Uuid, now: DateTime<Utc>) -> anyhow::Result<bool> {
        let filter = format!("id=eq.{}&status=eq.scheduled", reminder_id);
        let patch = json!({
            "status": ReminderStatus::Sent,
            "sent_at": now.to_rfc3339(),
        });

        let rows = self.store.update_returning("reminders", &filter, patch).await?;
        Ok(!rows.is_empty())
    }

    async fn lookup_user(&self, user_id: Uuid) -> Option<Value> {
        if user_id.is_nil() {
            return None;
        }

        let path = format!("/rest/v1/users?id=eq.{}", user_id);
        match self.store.request::<Vec<Value>>(Method::GET, &path, None).await {
            Ok(mut rows) if !rows.is_empty() => Some(rows.remove(0)),
            Ok(_) => None,
            Err(e) => {
                error!("Could not fetch user {}: {}", user_id, e);
                None
            }
        }
    }
}
