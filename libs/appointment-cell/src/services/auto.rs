use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{error, info};
use uuid::Uuid;

use questionnaire_cell::QuestionnaireService;
use reminder_cell::models::ScheduleReminderRequest;
use reminder_cell::ReminderSchedulerService;
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::AuthUser;
use shared_models::records::ReminderChannel;
use shared_models::time::SlotTime;

use crate::models::{
    AppointmentError, AutoBookRequest, BookAppointmentRequest, TriggerAgentsRequest,
    TriggerOperation,
};
use crate::services::booking::{authorize_involved, AppointmentBookingService};
use crate::services::slots::clinic_day_grid;

struct SelectedDoctor {
    id: Uuid,
    name: String,
    specialty: String,
}

/// End-to-end automatic booking: pick a doctor, pick a free slot, create
/// the confirmed appointment, then (best-effort) schedule the 24-hour
/// reminder and seed the pre-visit questionnaire.
pub struct AutoBookingService {
    store: SupabaseClient,
    booking: AppointmentBookingService,
    reminders: ReminderSchedulerService,
    questionnaires: QuestionnaireService,
}

impl AutoBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: SupabaseClient::new(config),
            booking: AppointmentBookingService::new(config),
            reminders: ReminderSchedulerService::new(config),
            questionnaires: QuestionnaireService::new(config),
        }
    }

    pub async fn auto_book(
        &self,
        request: AutoBookRequest,
        user: &AuthUser,
    ) -> Result<Value, AppointmentError> {
        let now = Utc::now();

        let doctor = self
            .select_doctor(request.preferred_specialty.as_deref())
            .await?;

        let mut date = request
            .preferred_date
            .unwrap_or_else(|| (now + Duration::days(1)).date_naive());
        let mut free_times = self.free_times(doctor.id, date, now).await?;
        if free_times.is_empty() {
            // Day is fully booked (or already over): move out and offer the
            // start of the grid.
            date = (now + Duration::days(2)).date_naive();
            free_times = clinic_day_grid().into_iter().take(5).collect();
        }

        let fallback_time = SlotTime::new(10, 0).unwrap_or_else(|| clinic_day_grid()[0]);
        let time = request
            .preferred_time
            .or_else(|| free_times.first().copied())
            .unwrap_or(fallback_time);

        let slot_candidates = free_times.len();

        info!(
            "Automatic booking selected {} ({}) on {} at {}",
            doctor.name, doctor.specialty, date, time
        );

        let (appointment, envelope) = self
            .booking
            .book(BookAppointmentRequest {
                patient_id: request.patient_id,
                doctor_id: doctor.id,
                doctor_name: doctor.name.clone(),
                patient_name: request.patient_name.clone(),
                date,
                time,
                reason: request.reason.clone(),
                specialty: Some(doctor.specialty.clone()),
            })
            .await?;

        let mut reminder_scheduled = false;
        if request.auto_schedule_reminders {
            let reminder_request = ScheduleReminderRequest {
                appointment_id: appointment.id,
                channel: ReminderChannel::Email,
                hours_before: 24,
            };
            match self.reminders.schedule(reminder_request, user).await {
                Ok(_) => reminder_scheduled = true,
                Err(e) => error!("Failed to schedule automatic reminder: {}", e),
            }
        }

        let mut questionnaire = None;
        if request.auto_send_questionnaire {
            match self
                .questionnaires
                .seed_automatic(&appointment, request.reason.as_deref())
                .await
            {
                Ok(q) => questionnaire = Some(q),
                Err(e) => error!("Failed to create automatic questionnaire: {}", e),
            }
        }

        let steps = json!([
            format!(
                "Booking Agent analyzed your request for {}",
                request.reason.as_deref().unwrap_or("an appointment")
            ),
            format!("Selected {} ({}) as the best match", doctor.name, doctor.specialty),
            format!("Analyzed {} available slot(s)", slot_candidates),
            format!("Selected optimal slot: {} at {}", date, time),
            "Verified appointment conflicts and confirmed booking".to_string(),
        ]);

        let explanation = format!(
            "Booking Agent booked your appointment with {} ({}) for {} at {}, \
             chosen from {} available slot(s) based on doctor availability, \
             specialty match, and your preferences.",
            doctor.name, doctor.specialty, date, time, slot_candidates
        );

        Ok(json!({
            "success": true,
            "appointment": appointment,
            "reminder_scheduled": reminder_scheduled,
            "questionnaire": questionnaire,
            "agent_result": envelope,
            "agent_explanation": {
                "action": "Automatic Appointment Booking",
                "explanation": explanation,
                "steps": steps,
                "slot_selected": {
                    "doctor": doctor.name,
                    "date": date,
                    "time": time,
                    "reason": request.reason.as_deref().unwrap_or("Routine checkup"),
                },
            },
            "message": "Automatic booking completed successfully",
        }))
    }

    /// Run the reminder and/or questionnaire agents for an existing
    /// appointment. Per-operation failures land in the response instead of
    /// failing the request.
    pub async fn trigger_agents(
        &self,
        appointment_id: Uuid,
        request: TriggerAgentsRequest,
        user: &AuthUser,
    ) -> Result<Value, AppointmentError> {
        let appointment = self.booking.get(appointment_id).await?;
        authorize_involved(user, &appointment)?;

        let mut results = Map::new();

        for operation in &request.operations {
            match operation {
                TriggerOperation::Reminder => {
                    let reminder_request = ScheduleReminderRequest {
                        appointment_id,
                        channel: ReminderChannel::Email,
                        hours_before: 24,
                    };
                    let entry = match self.reminders.schedule(reminder_request, user).await {
                        Ok((reminder, envelope)) => json!({
                            "reminder": reminder,
                            "agent_result": envelope,
                        }),
                        Err(e) => {
                            error!("Failed to trigger reminder agent: {}", e);
                            json!({ "error": e.to_string() })
                        }
                    };
                    results.insert("reminder".to_string(), entry);
                }
                TriggerOperation::Questionnaire => {
                    let entry = match self.questionnaires.seed_automatic(&appointment, None).await {
                        Ok(q) => json!({ "questionnaire": q }),
                        Err(e) => {
                            error!("Failed to trigger questionnaire agent: {}", e);
                            json!({ "error": e.to_string() })
                        }
                    };
                    results.insert("questionnaire".to_string(), entry);
                }
            }
        }

        Ok(json!({
            "success": true,
            "agent_results": Value::Object(results),
        }))
    }

    async fn select_doctor(&self, specialty: Option<&str>) -> Result<SelectedDoctor, AppointmentError> {
        let mut doctors = self.fetch_doctors(specialty, 10).await?;
        if doctors.is_empty() && specialty.is_some() {
            doctors = self.fetch_doctors(None, 5).await?;
        }

        let Some(doctor) = doctors.first() else {
            return Ok(SelectedDoctor {
                id: Uuid::nil(),
                name: "Dr. Default".to_string(),
                specialty: "General".to_string(),
            });
        };

        Ok(SelectedDoctor {
            id: doctor["id"]
                .as_str()
                .and_then(|id| Uuid::parse_str(id).ok())
                .unwrap_or_else(Uuid::nil),
            name: doctor["full_name"]
                .as_str()
                .filter(|s| !s.is_empty())
                .unwrap_or("Dr. Unknown")
                .to_string(),
            specialty: doctor["specialty"]
                .as_str()
                .filter(|s| !s.is_empty())
                .unwrap_or("General")
                .to_string(),
        })
    }

    async fn fetch_doctors(
        &self,
        specialty: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Value>, AppointmentError> {
        let mut path = format!("/rest/v1/users?role=eq.doctor&limit={}", limit);
        if let Some(specialty) = specialty {
            path.push_str(&format!("&specialty=eq.{}", urlencoding::encode(specialty)));
        }

        self.store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))
    }

    async fn free_times(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<SlotTime>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?date=eq.{}&status=eq.confirmed",
            date.format("%Y-%m-%d")
        );
        let appointments: Vec<Value> = self
            .store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let booked: Vec<SlotTime> = appointments
            .iter()
            .filter(|apt| {
                apt["doctor_id"]
                    .as_str()
                    .and_then(|id| Uuid::parse_str(id).ok())
                    == Some(doctor_id)
            })
            .filter_map(|apt| apt["time"].as_str().and_then(|label| label.parse().ok()))
            .collect();

        let mut times = clinic_day_grid();
        if date == now.date_naive() {
            times.retain(|t| t.as_time() > now.time());
        }
        times.retain(|t| !booked.contains(t));

        Ok(times)
    }
}
