use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use agent_cell::{AgentDispatcher, AgentIntent};
use notification_cell::models::QuestionnaireAnswers;
use notification_cell::ContentService;
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::AuthUser;
use shared_models::records::{Appointment, Questionnaire};

use crate::models::{QuestionnaireError, SubmitQuestionnaireRequest};

pub struct QuestionnaireService {
    store: SupabaseClient,
    agents: AgentDispatcher,
    content: ContentService,
}

impl QuestionnaireService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: SupabaseClient::new(config),
            agents: AgentDispatcher::from_config(config),
            content: ContentService::new(config),
        }
    }

    /// Submit (or resubmit) a pre-visit questionnaire. Only the
    /// appointment's patient may submit; at most one questionnaire exists
    /// per appointment, so resubmission updates in place.
    pub async fn submit(
        &self,
        request: SubmitQuestionnaireRequest,
        user: &AuthUser,
    ) -> Result<Questionnaire, QuestionnaireError> {
        let appointment = self.fetch_appointment(request.appointment_id).await?;

        let owns_appointment = appointment["patient_id"].as_str() == Some(user.id.as_str());
        if !user.is_patient() || !owns_appointment {
            return Err(QuestionnaireError::NotAuthorized);
        }

        let task = format!(
            "Process pre-visit questionnaire for appointment {}",
            request.appointment_id
        );
        let context = json!({
            "action": "process_questionnaire",
            "appointment_id": request.appointment_id,
            "chief_complaint": request.chief_complaint,
        });
        self.agents
            .dispatch(AgentIntent::ProcessQuestionnaire, &task, context)
            .await;

        let answers = QuestionnaireAnswers {
            chief_complaint: request.chief_complaint.clone(),
            symptoms: request.symptoms.clone(),
            medical_history: request.medical_history.clone(),
            current_medications: request.current_medications.clone(),
        };
        let summary = self.content.questionnaire_summary(&answers).await;

        self.upsert(&request, user.id.as_str(), &summary).await
    }

    /// Fetch the questionnaire for an appointment. Patients only see their
    /// own; doctors and admins see any.
    pub async fn get_for_appointment(
        &self,
        appointment_id: Uuid,
        user: &AuthUser,
    ) -> Result<Questionnaire, QuestionnaireError> {
        let appointment = self.fetch_appointment(appointment_id).await?;

        if user.is_patient() && appointment["patient_id"].as_str() != Some(user.id.as_str()) {
            return Err(QuestionnaireError::NotAuthorized);
        }

        self.find_by_appointment(appointment_id)
            .await?
            .ok_or(QuestionnaireError::NotFound)
    }

    /// The generated clinical summary, produced on demand when the stored
    /// record has none and persisted back.
    pub async fn summary(
        &self,
        appointment_id: Uuid,
        user: &AuthUser,
    ) -> Result<String, QuestionnaireError> {
        let questionnaire = self.get_for_appointment(appointment_id, user).await?;

        if let Some(summary) = questionnaire
            .summary
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        {
            return Ok(summary.to_string());
        }

        let answers = QuestionnaireAnswers {
            chief_complaint: questionnaire.chief_complaint.clone(),
            symptoms: questionnaire.symptoms.clone(),
            medical_history: questionnaire.medical_history.clone(),
            current_medications: questionnaire.current_medications.clone(),
        };
        let summary = self.content.questionnaire_summary(&answers).await;

        let filter = format!("id=eq.{}", questionnaire.id);
        self.store
            .update_returning("questionnaires", &filter, json!({ "summary": summary }))
            .await
            .map_err(|e| QuestionnaireError::Database(e.to_string()))?;

        Ok(summary)
    }

    /// Seed a placeholder questionnaire during automatic booking. No role
    /// check: the caller has already authorized the appointment operation.
    pub async fn seed_automatic(
        &self,
        appointment: &Appointment,
        reason: Option<&str>,
    ) -> Result<Questionnaire, QuestionnaireError> {
        let request = SubmitQuestionnaireRequest {
            appointment_id: appointment.id,
            chief_complaint: Some(
                reason
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or("Automatic questionnaire - Please fill out")
                    .to_string(),
            ),
            symptoms: None,
            medical_history: None,
            current_medications: None,
            allergies: None,
            additional_notes: Some(
                "This questionnaire was automatically generated. Please update with your details."
                    .to_string(),
            ),
        };

        let task = format!("Process pre-visit questionnaire for appointment {}", appointment.id);
        self.agents
            .dispatch(
                AgentIntent::ProcessQuestionnaire,
                &task,
                json!({
                    "action": "process_questionnaire",
                    "appointment_id": appointment.id,
                    "automatic": true,
                }),
            )
            .await;

        let answers = QuestionnaireAnswers {
            chief_complaint: request.chief_complaint.clone(),
            ..Default::default()
        };
        let summary = self.content.questionnaire_summary(&answers).await;

        self.upsert(&request, &appointment.patient_id.to_string(), &summary)
            .await
    }

    async fn upsert(
        &self,
        request: &SubmitQuestionnaireRequest,
        patient_id: &str,
        summary: &str,
    ) -> Result<Questionnaire, QuestionnaireError> {
        let existing = self.find_by_appointment(request.appointment_id).await?;
        let now = Utc::now();

        let row = json!({
            "appointment_id": request.appointment_id,
            "patient_id": patient_id,
            "chief_complaint": request.chief_complaint,
            "symptoms": request.symptoms,
            "medical_history": request.medical_history,
            "current_medications": request.current_medications,
            "allergies": request.allergies,
            "additional_notes": request.additional_notes,
            "summary": summary,
            "submitted_at": now.to_rfc3339(),
        });

        let rows = match existing {
            Some(current) => {
                debug!("Updating questionnaire {}", current.id);
                let filter = format!("id=eq.{}", current.id);
                self.store
                    .update_returning("questionnaires", &filter, row)
                    .await
                    .map_err(|e| QuestionnaireError::Database(e.to_string()))?
            }
            None => self
                .store
                .insert_returning("questionnaires", row)
                .await
                .map_err(|e| QuestionnaireError::Database(e.to_string()))?,
        };

        let questionnaire: Questionnaire = rows
            .into_iter()
            .next()
            .ok_or_else(|| QuestionnaireError::Database("Failed to store questionnaire".to_string()))
            .and_then(|value| {
                serde_json::from_value(value).map_err(|e| {
                    QuestionnaireError::Database(format!("Failed to parse questionnaire: {}", e))
                })
            })?;

        info!("Questionnaire stored: {}", questionnaire.id);
        Ok(questionnaire)
    }

    async fn find_by_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<Questionnaire>, QuestionnaireError> {
        let path = format!(
            "/rest/v1/questionnaires?appointment_id=eq.{}&limit=1",
            appointment_id
        );
        let rows: Vec<Value> = self
            .store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| QuestionnaireError::Database(e.to_string()))?;

        match rows.into_iter().next() {
            Some(row) => serde_json::from_value(row)
                .map(Some)
                .map_err(|e| QuestionnaireError::Database(format!("Failed to parse questionnaire: {}", e))),
            None => Ok(None),
        }
    }

    async fn fetch_appointment(&self, appointment_id: Uuid) -> Result<Value, QuestionnaireError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Value> = self
            .store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| QuestionnaireError::Database(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or(QuestionnaireError::AppointmentNotFound)
    }
}
