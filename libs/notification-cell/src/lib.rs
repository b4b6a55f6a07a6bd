// =====================================================================================
// NOTIFICATION CELL - GENERATED CONTENT & EMAIL DELIVERY
// =====================================================================================
//
// Builds human-readable email and summary text, preferring the generative
// text API and always degrading to fixed templates. Delivery goes through
// an email transport with a log-only mock mode.
//
// =====================================================================================

pub mod models;
pub mod services;

pub use models::{EmailContent, EmailDetails, QuestionnaireAnswers};
pub use services::content::ContentService;
pub use services::email::EmailService;
