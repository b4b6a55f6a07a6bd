use serde::{Deserialize, Serialize};

/// Subject/body pair for an outgoing email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

/// The structured fields every email kind is rendered from. Dates and
/// times are display strings here; parsing happened upstream.
#[derive(Debug, Clone)]
pub struct EmailDetails {
    pub patient_name: String,
    pub doctor_name: String,
    pub specialty: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub reason: Option<String>,
    pub questionnaire_required: bool,
}

/// Clinical fields a questionnaire summary is built from.
#[derive(Debug, Clone, Default)]
pub struct QuestionnaireAnswers {
    pub chief_complaint: Option<String>,
    pub symptoms: Option<String>,
    pub medical_history: Option<String>,
    pub current_medications: Option<String>,
}
