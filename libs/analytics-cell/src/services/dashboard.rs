use std::collections::{HashMap, HashSet};

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::AuthUser;
use shared_models::time::SlotTime;

/// Role-scoped dashboard and stats aggregation. All counting happens in
/// process over equality-filtered scans; the store offers nothing richer.
pub struct AnalyticsService {
    store: SupabaseClient,
}

impl AnalyticsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: SupabaseClient::new(config),
        }
    }

    pub async fn dashboard(&self, user: &AuthUser) -> Result<Value> {
        if user.is_doctor() {
            self.doctor_dashboard(&user.id).await
        } else if user.is_admin() {
            self.admin_dashboard().await
        } else {
            self.patient_dashboard(&user.id).await
        }
    }

    async fn patient_dashboard(&self, user_id: &str) -> Result<Value> {
        debug!("Building patient dashboard for {}", user_id);

        let appointments = self
            .fetch(&format!("/rest/v1/appointments?patient_id=eq.{}", user_id))
            .await?;

        let today = Utc::now().date_naive();
        let mut confirmed = 0usize;
        let mut pending = 0usize;
        let mut upcoming = Vec::new();

        for appointment in &appointments {
            match appointment["status"].as_str() {
                Some("confirmed") => confirmed += 1,
                Some("pending") => pending += 1,
                _ => {}
            }

            if let Some(date) = parse_date(appointment) {
                if date >= today {
                    upcoming.push(json!({
                        "id": appointment["id"],
                        "doctor_name": appointment["doctor_name"],
                        "date": appointment["date"],
                        "time": appointment["time"],
                        "status": appointment["status"],
                    }));
                }
            }
        }
        upcoming.truncate(5);

        let questionnaires = self
            .fetch(&format!("/rest/v1/questionnaires?patient_id=eq.{}", user_id))
            .await?;

        Ok(json!({
            "total_appointments": appointments.len(),
            "confirmed_appointments": confirmed,
            "pending_appointments": pending,
            "upcoming_appointments": upcoming,
            "total_questionnaires": questionnaires.len(),
        }))
    }

    async fn doctor_dashboard(&self, user_id: &str) -> Result<Value> {
        debug!("Building doctor dashboard for {}", user_id);

        let appointments = self
            .fetch(&format!("/rest/v1/appointments?doctor_id=eq.{}", user_id))
            .await?;

        let today = Utc::now().date_naive();
        let mut patients = HashSet::new();
        let mut today_schedule = Vec::new();
        let mut confirmed_ids = Vec::new();

        for appointment in &appointments {
            if let Some(patient_id) = appointment["patient_id"].as_str() {
                patients.insert(patient_id.to_string());
            }
            if appointment["status"].as_str() == Some("confirmed") {
                if let Some(id) = appointment["id"].as_str() {
                    confirmed_ids.push(id.to_string());
                }
            }
            if parse_date(appointment) == Some(today) {
                today_schedule.push(appointment.clone());
            }
        }

        // Grid labels sort by time of day, not lexically.
        today_schedule.sort_by_key(|apt| {
            apt["time"]
                .as_str()
                .and_then(|label| label.parse::<SlotTime>().ok())
                .map(|t| t.as_time())
        });
        let today_schedule: Vec<Value> = today_schedule
            .iter()
            .map(|apt| {
                json!({
                    "id": apt["id"],
                    "patient_name": apt["patient_name"],
                    "time": apt["time"],
                    "status": apt["status"],
                    "type": apt["reason"].as_str().unwrap_or("Consultation"),
                })
            })
            .collect();

        let pending_reviews = if confirmed_ids.is_empty() {
            0
        } else {
            let path = format!(
                "/rest/v1/questionnaires?appointment_id=in.({})",
                confirmed_ids.join(",")
            );
            self.fetch(&path).await?.len()
        };

        Ok(json!({
            "total_appointments": appointments.len(),
            "today_appointments": today_schedule.len(),
            "total_patients": patients.len(),
            "pending_reviews": pending_reviews,
            "today_schedule": today_schedule,
        }))
    }

    async fn admin_dashboard(&self) -> Result<Value> {
        debug!("Building admin dashboard");

        let appointments = self.fetch("/rest/v1/appointments?").await?;
        let mut by_status: HashMap<&str, usize> = HashMap::new();
        for appointment in &appointments {
            if let Some(status) = appointment["status"].as_str() {
                match status {
                    "confirmed" => *by_status.entry("confirmed").or_insert(0) += 1,
                    "pending" => *by_status.entry("pending").or_insert(0) += 1,
                    "cancelled" => *by_status.entry("cancelled").or_insert(0) += 1,
                    _ => {}
                }
            }
        }

        let users = self.fetch("/rest/v1/users?").await?;
        let mut total_patients = 0usize;
        let mut total_doctors = 0usize;
        for user in &users {
            match user["role"].as_str() {
                Some("patient") => total_patients += 1,
                Some("doctor") => total_doctors += 1,
                _ => {}
            }
        }

        let reminders = self.fetch("/rest/v1/reminders?").await?;
        let questionnaires = self.fetch("/rest/v1/questionnaires?").await?;

        Ok(json!({
            "total_appointments": appointments.len(),
            "total_confirmed": by_status.get("confirmed").copied().unwrap_or(0),
            "total_pending": by_status.get("pending").copied().unwrap_or(0),
            "total_cancelled": by_status.get("cancelled").copied().unwrap_or(0),
            "total_users": users.len(),
            "total_patients": total_patients,
            "total_doctors": total_doctors,
            "total_reminders": reminders.len(),
            "total_questionnaires": questionnaires.len(),
        }))
    }

    /// Windowed totals by status and specialty. Doctors are scoped to
    /// their own appointments; admins see everything.
    pub async fn stats(&self, days: i64, user: &AuthUser) -> Result<Value> {
        let path = if user.is_doctor() {
            format!("/rest/v1/appointments?doctor_id=eq.{}", user.id)
        } else {
            "/rest/v1/appointments?".to_string()
        };
        let appointments = self.fetch(&path).await?;

        let cutoff = Utc::now() - Duration::days(days);
        let mut total = 0usize;
        let mut by_status: HashMap<String, usize> = HashMap::new();
        for status in ["confirmed", "pending", "cancelled", "completed"] {
            by_status.insert(status.to_string(), 0);
        }
        let mut by_specialty: HashMap<String, usize> = HashMap::new();

        for appointment in &appointments {
            let created_at = appointment["created_at"]
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc));
            let Some(created_at) = created_at else { continue };
            if created_at < cutoff {
                continue;
            }

            total += 1;
            if let Some(status) = appointment["status"].as_str() {
                if let Some(count) = by_status.get_mut(status) {
                    *count += 1;
                }
            }
            let specialty = appointment["specialty"].as_str().unwrap_or("General");
            *by_specialty.entry(specialty.to_string()).or_insert(0) += 1;
        }

        Ok(json!({
            "period_days": days,
            "total_appointments": total,
            "by_status": by_status,
            "by_specialty": by_specialty,
        }))
    }

    async fn fetch(&self, path: &str) -> Result<Vec<Value>> {
        self.store.request(Method::GET, path, None).await
    }
}

fn parse_date(appointment: &Value) -> Option<NaiveDate> {
    appointment["date"]
        .as_str()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}
