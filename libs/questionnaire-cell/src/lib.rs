pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{QuestionnaireError, SubmitQuestionnaireRequest};
pub use router::questionnaire_routes;
pub use services::previsit::QuestionnaireService;
