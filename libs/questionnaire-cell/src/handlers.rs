use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{QuestionnaireError, SubmitQuestionnaireRequest};
use crate::services::previsit::QuestionnaireService;

fn map_questionnaire_error(e: QuestionnaireError) -> AppError {
    match e {
        QuestionnaireError::AppointmentNotFound => {
            AppError::NotFound("Appointment not found".to_string())
        }
        QuestionnaireError::NotFound => {
            AppError::NotFound("Questionnaire not found for this appointment".to_string())
        }
        QuestionnaireError::NotAuthorized => {
            AppError::Forbidden("Not authorized to access this questionnaire".to_string())
        }
        QuestionnaireError::Database(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn submit_questionnaire(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<SubmitQuestionnaireRequest>,
) -> Result<Json<Value>, AppError> {
    let service = QuestionnaireService::new(&state);

    let questionnaire = service
        .submit(request, &user)
        .await
        .map_err(map_questionnaire_error)?;

    Ok(Json(json!(questionnaire)))
}

#[axum::debug_handler]
pub async fn get_questionnaire(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = QuestionnaireService::new(&state);

    let questionnaire = service
        .get_for_appointment(appointment_id, &user)
        .await
        .map_err(map_questionnaire_error)?;

    Ok(Json(json!(questionnaire)))
}

#[axum::debug_handler]
pub async fn get_questionnaire_summary(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = QuestionnaireService::new(&state);

    let summary = service
        .summary(appointment_id, &user)
        .await
        .map_err(map_questionnaire_error)?;

    Ok(Json(json!({
        "appointment_id": appointment_id,
        "summary": summary,
        "generated_at": Utc::now().to_rfc3339(),
    })))
}
