use axum::{extract::State, response::IntoResponse, Json};

use crate::dto::interview_dto::{
    EvaluateAnswersPayload, GenerateQuestionsPayload, GenerateQuestionsResponse,
};
use crate::error::{Error, Result};
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/generate-questions",
    request_body = GenerateQuestionsPayload,
    responses(
        (status = 200, description = "Six questions, two per difficulty tier", body = Json<serde_json::Value>)
    )
)]
#[axum::debug_handler]
pub async fn generate_questions(
    State(state): State<AppState>,
    Json(payload): Json<GenerateQuestionsPayload>,
) -> Result<impl IntoResponse> {
    let name = match payload.candidate_name.trim() {
        "" => "the candidate",
        name => name,
    };
    let questions = state.ai_service.generate_questions(name).await;
    Ok(Json(GenerateQuestionsResponse { questions }))
}

#[utoipa::path(
    post,
    path = "/api/evaluate-answers",
    responses(
        (status = 200, description = "Score between 0 and 100 with a summary", body = Json<serde_json::Value>),
        (status = 400, description = "No questions supplied")
    )
)]
#[axum::debug_handler]
pub async fn evaluate_answers(
    State(state): State<AppState>,
    Json(payload): Json<EvaluateAnswersPayload>,
) -> Result<impl IntoResponse> {
    if payload.questions.is_empty() {
        return Err(Error::BadRequest("At least one question is required".into()));
    }
    let evaluation = state
        .ai_service
        .evaluate_answers(&payload.questions, &payload.answers)
        .await;
    Ok(Json(evaluation))
}
