use anyhow::{anyhow, Result};
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use shared_config::AppConfig;

use crate::models::{EmailContent, EmailDetails, QuestionnaireAnswers};

const GEMINI_MODEL: &str = "gemini-2.5-flash";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Copy)]
enum EmailKind {
    Confirmation,
    Reminder,
}

/// Produces email and summary text. The generative path is best-effort;
/// every failure mode degrades to the fixed templates, so callers never
/// see an error from this service.
pub struct ContentService {
    model: Option<GeminiClient>,
    clinic_name: String,
    clinic_phone: String,
}

impl ContentService {
    pub fn new(config: &AppConfig) -> Self {
        let model = if config.gemini_api_key.is_empty() {
            info!("GEMINI_API_KEY not set, content will use templates");
            None
        } else {
            Some(GeminiClient::new(&config.gemini_api_key))
        };

        Self {
            model,
            clinic_name: config.clinic_name.clone(),
            clinic_phone: config.clinic_phone.clone(),
        }
    }

    pub async fn confirmation_email(&self, details: &EmailDetails) -> EmailContent {
        match self.generated_email(EmailKind::Confirmation, details).await {
            Some(content) => content,
            None => self.template_email(EmailKind::Confirmation, details),
        }
    }

    pub async fn reminder_email(&self, details: &EmailDetails) -> EmailContent {
        match self.generated_email(EmailKind::Reminder, details).await {
            Some(content) => content,
            None => self.template_email(EmailKind::Reminder, details),
        }
    }

    pub async fn questionnaire_summary(&self, answers: &QuestionnaireAnswers) -> String {
        if let Some(model) = &self.model {
            match model.generate(&self.summary_prompt(answers)).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!("Questionnaire summarized with {}", GEMINI_MODEL);
                    return text.trim().to_string();
                }
                Ok(_) => warn!("Empty summary from model, using simple summary"),
                Err(e) => error!("Summary generation failed: {}, using simple summary", e),
            }
        }

        Self::fallback_summary(answers)
    }

    /// Concatenate the non-empty known fields, each with its label, in a
    /// fixed order. All empty means the fixed sentinel.
    pub fn fallback_summary(answers: &QuestionnaireAnswers) -> String {
        let fields = [
            ("Chief Complaint", &answers.chief_complaint),
            ("Symptoms", &answers.symptoms),
            ("Medical History", &answers.medical_history),
            ("Current Medications", &answers.current_medications),
        ];

        let parts: Vec<String> = fields
            .iter()
            .filter_map(|(label, value)| {
                value
                    .as_deref()
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| format!("{}: {}", label, v))
            })
            .collect();

        if parts.is_empty() {
            "No summary available".to_string()
        } else {
            parts.join("\n")
        }
    }

    async fn generated_email(&self, kind: EmailKind, details: &EmailDetails) -> Option<EmailContent> {
        let model = self.model.as_ref()?;

        let text = match model.generate(&self.email_prompt(kind, details)).await {
            Ok(text) => text,
            Err(e) => {
                error!("Email content generation failed: {}, using template", e);
                return None;
            }
        };

        let (_, body) = match parse_subject_body(&text) {
            Some(parsed) => parsed,
            None => {
                warn!("Failed to parse generated email content, using template");
                return None;
            }
        };

        let body = self.post_process(&body);

        // The model's subject suggestion is discarded in favor of the
        // deterministic template-derived one.
        info!("Email content generated with {}", GEMINI_MODEL);
        Some(EmailContent {
            subject: self.deterministic_subject(kind, details),
            body,
        })
    }

    fn deterministic_subject(&self, kind: EmailKind, details: &EmailDetails) -> String {
        match kind {
            EmailKind::Confirmation => format!(
                "Appointment Booked: {} on {}",
                details.doctor_name, details.appointment_date
            ),
            EmailKind::Reminder => format!(
                "24-Hour Reminder: {} Appt Tomorrow",
                details.doctor_name
            ),
        }
    }

    fn email_prompt(&self, kind: EmailKind, details: &EmailDetails) -> String {
        let reason = details.reason.clone().unwrap_or_else(|| "General consultation".to_string());

        match kind {
            EmailKind::Confirmation => {
                let questionnaire_line = if details.questionnaire_required {
                    "- IMPORTANT: Remind the patient to complete the pre-visit questionnaire in the app before the appointment (do NOT include hyperlinks)."
                } else {
                    ""
                };
                format!(
                    "Generate a warm, professional appointment confirmation email for a medical appointment.\n\n\
                     Patient Name: {patient}\n\
                     Doctor: {doctor} ({specialty})\n\
                     Date: {date}\n\
                     Time: {time}\n\
                     Reason: {reason}\n\
                     Clinic Name: {clinic}\n\
                     Clinic Phone: {phone}\n\n\
                     Generate:\n\
                     1. A clear, friendly subject line (max 60 characters)\n\
                     2. A professional HTML email body that includes:\n\
                     - Warm greeting and confirmation of the appointment details\n\
                     - Clear appointment information (doctor, date, time, specialty)\n\
                     - Instruction to arrive 10 minutes early\n\
                     {questionnaire_line}\n\
                     - Clinic contact line with phone number and clinic name\n\
                     - Professional closing\n\n\
                     Constraints:\n\
                     - Do NOT include any web links or 'Click here' text. The app is not hosted.\n\
                     - Use the clinic name \"{clinic}\" and phone \"{phone}\" instead of placeholders.\n\n\
                     Format the response as:\n\
                     SUBJECT: [subject line]\n\
                     BODY: [HTML body - use proper HTML formatting with inline styles for email clients]",
                    patient = details.patient_name,
                    doctor = details.doctor_name,
                    specialty = details.specialty,
                    date = details.appointment_date,
                    time = details.appointment_time,
                    reason = reason,
                    clinic = self.clinic_name,
                    phone = self.clinic_phone,
                    questionnaire_line = questionnaire_line,
                )
            }
            EmailKind::Reminder => format!(
                "Generate a friendly appointment reminder email for a medical appointment happening in 24 hours.\n\n\
                 Patient Name: {patient}\n\
                 Doctor: {doctor} ({specialty})\n\
                 Date: {date}\n\
                 Time: {time}\n\
                 Reason: {reason}\n\
                 Clinic Name: {clinic}\n\
                 Clinic Phone: {phone}\n\n\
                 Generate:\n\
                 1. An urgent but friendly subject line (max 60 characters, mention \"tomorrow\" or \"24 hours\")\n\
                 2. A professional HTML email body that includes:\n\
                 - Friendly reminder greeting and clear appointment details\n\
                 - Reminder that the appointment is tomorrow\n\
                 - Instruction to arrive 10 minutes early\n\
                 - Clinic contact line with phone number and clinic name\n\
                 - Professional closing\n\n\
                 Constraints:\n\
                 - Do NOT include any web links or 'Click here' text. The app is not hosted.\n\
                 - Use the clinic name \"{clinic}\" and phone \"{phone}\" instead of placeholders.\n\n\
                 Format the response as:\n\
                 SUBJECT: [subject line]\n\
                 BODY: [HTML body - use proper HTML formatting with inline styles for email clients]",
                patient = details.patient_name,
                doctor = details.doctor_name,
                specialty = details.specialty,
                date = details.appointment_date,
                time = details.appointment_time,
                reason = reason,
                clinic = self.clinic_name,
                phone = self.clinic_phone,
            ),
        }
    }

    fn summary_prompt(&self, answers: &QuestionnaireAnswers) -> String {
        format!(
            "Summarize the following pre-visit medical questionnaire in a concise, professional format:\n\n\
             Chief complaint: {}\n\
             Symptoms: {}\n\
             Medical history: {}\n\
             Current medications: {}\n\n\
             Provide a clear summary highlighting:\n\
             1. Chief complaint/primary concern\n\
             2. Current symptoms\n\
             3. Relevant medical history\n\
             4. Current medications\n\
             5. Any urgent concerns\n\n\
             Keep the summary under 300 words.",
            answers.chief_complaint.as_deref().unwrap_or(""),
            answers.symptoms.as_deref().unwrap_or(""),
            answers.medical_history.as_deref().unwrap_or(""),
            answers.current_medications.as_deref().unwrap_or(""),
        )
    }

    /// Enforce the no-hyperlink constraint and clinic details on a model
    /// body, and drop any markdown code fences it wrapped the HTML in.
    fn post_process(&self, body: &str) -> String {
        let mut out = body.trim().to_string();

        out = out.replace("[Your Clinic Name]", &self.clinic_name);
        out = out.replace("[Your Clinic Phone Number]", &self.clinic_phone);

        if let Ok(re) = Regex::new(r"(?s)<a[^>]*>(.*?)</a>") {
            out = re.replace_all(&out, "$1").into_owned();
        }
        if let Ok(re) = Regex::new(r"(?i)click here[^.<]*") {
            out = re
                .replace_all(
                    &out,
                    "Please complete the pre-visit questionnaire in the app before your appointment.",
                )
                .into_owned();
        }
        if let Ok(re) = Regex::new(r"^```[a-zA-Z]*\s*") {
            out = re.replace(&out, "").into_owned();
        }
        if let Ok(re) = Regex::new(r"```\s*$") {
            out = re.replace(&out, "").into_owned();
        }

        out.trim().to_string()
    }

    fn template_email(&self, kind: EmailKind, details: &EmailDetails) -> EmailContent {
        let reason_row = details
            .reason
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .map(|r| format!("<p><strong>Reason:</strong> {}</p>", r))
            .unwrap_or_default();

        match kind {
            EmailKind::Confirmation => {
                let questionnaire_notice = if details.questionnaire_required {
                    "<div style='background-color: #fef3c7; padding: 15px; border-radius: 5px; margin: 20px 0; border-left: 4px solid #f59e0b;'>\
                     <p><strong>Important:</strong> Please complete the pre-visit questionnaire in the app before your appointment. This helps the doctor prepare for your visit.</p></div>"
                } else {
                    ""
                };

                EmailContent {
                    subject: format!(
                        "Appointment Confirmed with {} - {}",
                        details.doctor_name, details.appointment_date
                    ),
                    body: format!(
                        "<html>\n<body style=\"font-family: Arial, sans-serif; line-height: 1.6; color: #333;\">\n\
                         <div style=\"max-width: 600px; margin: 0 auto; padding: 20px;\">\n\
                         <h2 style=\"color: #2563eb;\">Appointment Confirmed</h2>\n\
                         <p>Dear {patient},</p>\n\
                         <p>Your appointment has been successfully booked!</p>\n\
                         <div style=\"background-color: #f3f4f6; padding: 15px; border-radius: 5px; margin: 20px 0;\">\n\
                         <p><strong>Doctor:</strong> {doctor} ({specialty})</p>\n\
                         <p><strong>Date:</strong> {date}</p>\n\
                         <p><strong>Time:</strong> {time}</p>\n\
                         {reason_row}\n\
                         </div>\n\
                         {questionnaire_notice}\n\
                         <p>Please arrive 10 minutes before your scheduled time.</p>\n\
                         <p>If you need to reschedule or cancel, please contact {clinic} at {phone} at least 24 hours in advance.</p>\n\
                         <p>Best regards,<br>{clinic}</p>\n\
                         </div>\n</body>\n</html>",
                        patient = details.patient_name,
                        doctor = details.doctor_name,
                        specialty = details.specialty,
                        date = details.appointment_date,
                        time = details.appointment_time,
                        reason_row = reason_row,
                        questionnaire_notice = questionnaire_notice,
                        clinic = self.clinic_name,
                        phone = self.clinic_phone,
                    ),
                }
            }
            EmailKind::Reminder => EmailContent {
                subject: format!(
                    "Reminder: Your Appointment Tomorrow with {}",
                    details.doctor_name
                ),
                body: format!(
                    "<html>\n<body style=\"font-family: Arial, sans-serif; line-height: 1.6; color: #333;\">\n\
                     <div style=\"max-width: 600px; margin: 0 auto; padding: 20px;\">\n\
                     <h2 style=\"color: #dc2626;\">Appointment Reminder</h2>\n\
                     <p>Dear {patient},</p>\n\
                     <p>This is a reminder that you have an appointment <strong>tomorrow</strong>.</p>\n\
                     <div style=\"background-color: #fef2f2; padding: 15px; border-radius: 5px; margin: 20px 0; border-left: 4px solid #dc2626;\">\n\
                     <p><strong>Doctor:</strong> {doctor} ({specialty})</p>\n\
                     <p><strong>Date:</strong> {date}</p>\n\
                     <p><strong>Time:</strong> {time}</p>\n\
                     {reason_row}\n\
                     </div>\n\
                     <p>Please arrive 10 minutes before your scheduled time.</p>\n\
                     <p>If you need to reschedule or cancel, please contact {clinic} at {phone} as soon as possible.</p>\n\
                     <p>Best regards,<br>{clinic}</p>\n\
                     </div>\n</body>\n</html>",
                    patient = details.patient_name,
                    doctor = details.doctor_name,
                    specialty = details.specialty,
                    date = details.appointment_date,
                    time = details.appointment_time,
                    reason_row = reason_row,
                    clinic = self.clinic_name,
                    phone = self.clinic_phone,
                ),
            },
        }
    }
}

/// Parse the two-section "SUBJECT: / BODY:" response format. Returns None
/// when either section is missing or empty.
fn parse_subject_body(content: &str) -> Option<(String, String)> {
    let mut subject = String::new();
    let mut body_lines: Vec<String> = Vec::new();
    let mut in_body = false;

    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("SUBJECT:") {
            subject = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("BODY:") {
            in_body = true;
            let body_text = rest.trim();
            if !body_text.is_empty() {
                body_lines.push(body_text.to_string());
            }
        } else if in_body {
            body_lines.push(line.to_string());
        }
    }

    if subject.is_empty() || body_lines.is_empty() {
        return None;
    }

    Some((subject, body_lines.join("\n")))
}

struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_BASE_URL, GEMINI_MODEL, self.api_key
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error ({}): {}", status, error_text));
        }

        let payload: Value = response.json().await?;
        payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Invalid Gemini response format"))
    }
}
