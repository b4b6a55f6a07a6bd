use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, error, info};
use uuid::Uuid;

use agent_cell::{AgentDispatcher, AgentEnvelope, AgentIntent};
use notification_cell::models::EmailDetails;
use notification_cell::{ContentService, EmailService};
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::AuthUser;
use shared_models::records::{Appointment, AppointmentStatus};

use crate::models::{
    AppointmentError, BookAppointmentRequest, CancelAppointmentRequest,
    RescheduleAppointmentRequest,
};

pub struct AppointmentBookingService {
    store: SupabaseClient,
    agents: AgentDispatcher,
    content: ContentService,
    mailer: EmailService,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: SupabaseClient::new(config),
            agents: AgentDispatcher::from_config(config),
            content: ContentService::new(config),
            mailer: EmailService::new(config),
        }
    }

    /// Book a new appointment. The record is written as confirmed; the
    /// confirmation email is best-effort and never fails the booking.
    pub async fn book(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<(Appointment, AgentEnvelope), AppointmentError> {
        info!(
            "Booking appointment for patient {} with doctor {}",
            request.patient_id, request.doctor_id
        );

        let task = format!(
            "Book an appointment for {} with {} on {} at {}",
            request.patient_name, request.doctor_name, request.date, request.time
        );
        let context = json!({
            "action": "book",
            "appointment_data": {
                "patient_id": request.patient_id,
                "doctor_id": request.doctor_id,
                "patient_name": request.patient_name,
                "doctor_name": request.doctor_name,
                "date": request.date,
                "time": request.time,
                "reason": request.reason,
                "specialty": request.specialty,
            },
        });
        let envelope = self.agents.dispatch(AgentIntent::Book, &task, context).await;

        let now = Utc::now();
        let row = json!({
            "patient_id": request.patient_id,
            "doctor_id": request.doctor_id,
            "doctor_name": request.doctor_name,
            "patient_name": request.patient_name,
            "date": request.date,
            "time": request.time,
            "status": AppointmentStatus::Confirmed,
            "reason": request.reason,
            "specialty": request.specialty,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });

        let inserted = self
            .store
            .insert_returning("appointments", row)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;
        let appointment: Appointment = inserted
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::Database("Failed to create appointment".to_string()))
            .and_then(|value| {
                serde_json::from_value(value).map_err(|e| {
                    AppointmentError::Database(format!("Failed to parse appointment: {}", e))
                })
            })?;

        info!("Appointment booked: {}", appointment.id);

        self.send_confirmation_email(&appointment).await;

        Ok((appointment, envelope))
    }

    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
        user: &AuthUser,
    ) -> Result<(Appointment, AgentEnvelope), AppointmentError> {
        let current = self.get(appointment_id).await?;
        authorize_involved(user, &current)?;

        let mut task = format!(
            "Reschedule appointment {} to {} at {}",
            appointment_id, request.new_date, request.new_time
        );
        if let Some(reason) = request.reason.as_deref().filter(|r| !r.is_empty()) {
            task.push_str(&format!(". Reason: {}", reason));
        }
        let context = json!({
            "action": "reschedule",
            "appointment_id": appointment_id,
            "new_date": request.new_date,
            "new_time": request.new_time,
            "reason": request.reason,
        });
        let envelope = self
            .agents
            .dispatch(AgentIntent::Reschedule, &task, context)
            .await;

        let patch = json!({
            "date": request.new_date,
            "time": request.new_time,
            "updated_at": Utc::now().to_rfc3339(),
        });
        let updated = self.patch_appointment(appointment_id, patch).await?;

        info!("Appointment rescheduled: {}", appointment_id);
        Ok((updated, envelope))
    }

    /// Cancel an appointment. The record is never deleted; only the status
    /// moves to cancelled.
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
        user: &AuthUser,
    ) -> Result<(Appointment, AgentEnvelope), AppointmentError> {
        let current = self.get(appointment_id).await?;
        authorize_involved(user, &current)?;

        let mut task = format!("Cancel appointment {}", appointment_id);
        if let Some(reason) = request.reason.as_deref().filter(|r| !r.is_empty()) {
            task.push_str(&format!(". Reason: {}", reason));
        }
        let context = json!({
            "action": "cancel",
            "appointment_id": appointment_id,
            "reason": request.reason,
        });
        let envelope = self.agents.dispatch(AgentIntent::Cancel, &task, context).await;

        let patch = json!({
            "status": AppointmentStatus::Cancelled,
            "updated_at": Utc::now().to_rfc3339(),
        });
        let cancelled = self.patch_appointment(appointment_id, patch).await?;

        info!("Appointment cancelled: {}", appointment_id);
        Ok((cancelled, envelope))
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::Database(format!("Failed to parse appointment: {}", e)))
    }

    /// Appointments visible to the caller: patients and doctors see their
    /// own, admins see everything.
    pub async fn list_for(&self, user: &AuthUser) -> Result<Vec<Appointment>, AppointmentError> {
        let mut path = "/rest/v1/appointments?".to_string();
        if user.is_doctor() {
            path.push_str(&format!("doctor_id=eq.{}&", user.id));
        } else if !user.is_admin() {
            path.push_str(&format!("patient_id=eq.{}&", user.id));
        }
        path.push_str("order=date.desc,time.desc");

        let rows: Vec<Value> = self
            .store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| {
                    AppointmentError::Database(format!("Failed to parse appointment: {}", e))
                })
            })
            .collect()
    }

    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        patch: Value,
    ) -> Result<Appointment, AppointmentError> {
        let filter = format!("id=eq.{}", appointment_id);
        let rows = self
            .store
            .update_returning("appointments", &filter, patch)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)
            .and_then(|value| {
                serde_json::from_value(value).map_err(|e| {
                    AppointmentError::Database(format!("Failed to parse appointment: {}", e))
                })
            })
    }

    async fn send_confirmation_email(&self, appointment: &Appointment) {
        let path = format!("/rest/v1/users?id=eq.{}", appointment.patient_id);
        let patient: Vec<Value> = match self.store.request(Method::GET, &path, None).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Failed to send confirmation email: {}", e);
                return;
            }
        };

        let patient_email = patient
            .first()
            .and_then(|p| p["email"].as_str())
            .unwrap_or_default();
        if patient_email.is_empty() {
            debug!("Patient has no email on file, skipping confirmation");
            return;
        }

        let details = EmailDetails {
            patient_name: appointment.patient_name.clone(),
            doctor_name: appointment.doctor_name.clone(),
            specialty: appointment
                .specialty
                .clone()
                .unwrap_or_else(|| "General".to_string()),
            appointment_date: appointment.date.format("%Y-%m-%d").to_string(),
            appointment_time: appointment.time.to_string(),
            reason: appointment.reason.clone(),
            questionnaire_required: true,
        };

        let content = self.content.confirmation_email(&details).await;
        if self
            .mailer
            .send(patient_email, &content.subject, &content.body, None)
            .await
        {
            info!("Confirmation email sent to {}", patient_email);
        } else {
            error!("Failed to send confirmation email to {}", patient_email);
        }
    }
}

pub fn authorize_involved(user: &AuthUser, appointment: &Appointment) -> Result<(), AppointmentError> {
    if user.is_admin()
        || appointment.patient_id.to_string() == user.id
        || appointment.doctor_id.to_string() == user.id
    {
        return Ok(());
    }
    Err(AppointmentError::NotAuthorized)
}
