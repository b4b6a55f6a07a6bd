use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitQuestionnaireRequest {
    pub appointment_id: Uuid,
    pub chief_complaint: Option<String>,
    pub symptoms: Option<String>,
    pub medical_history: Option<String>,
    pub current_medications: Option<String>,
    pub allergies: Option<String>,
    pub additional_notes: Option<String>,
}

#[derive(Error, Debug)]
pub enum QuestionnaireError {
    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Questionnaire not found")]
    NotFound,

    #[error("Not authorized for this questionnaire")]
    NotAuthorized,

    #[error("Database error: {0}")]
    Database(String),
}
