use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::dto::interview_dto::{
    ContactPayload, CreateCandidatePayload, DraftPayload, SessionInfoResponse, SubmitAnswerPayload,
};
use crate::error::Result;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/interview/candidates",
    request_body = CreateCandidatePayload,
    responses(
        (status = 201, description = "Candidate created and made current", body = Json<serde_json::Value>)
    )
)]
#[axum::debug_handler]
pub async fn create_candidate(
    State(state): State<AppState>,
    Json(payload): Json<CreateCandidatePayload>,
) -> Result<impl IntoResponse> {
    let candidate = state.interview.create_candidate(payload).await?;
    Ok((StatusCode::CREATED, Json(candidate)))
}

#[utoipa::path(
    get,
    path = "/api/interview/current",
    responses(
        (status = 200, description = "Current candidate, question and timer", body = Json<serde_json::Value>)
    )
)]
#[axum::debug_handler]
pub async fn get_current(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.interview.current().await))
}

#[utoipa::path(
    patch,
    path = "/api/interview/current",
    request_body = ContactPayload,
    responses(
        (status = 200, description = "Contact details updated", body = Json<serde_json::Value>),
        (status = 400, description = "Invalid contact details"),
        (status = 404, description = "No current candidate")
    )
)]
#[axum::debug_handler]
pub async fn update_current(
    State(state): State<AppState>,
    Json(payload): Json<ContactPayload>,
) -> Result<impl IntoResponse> {
    let candidate = state
        .interview
        .update_candidate_info(&payload.name, &payload.email, &payload.phone)
        .await?;
    Ok(Json(candidate))
}

#[utoipa::path(
    post,
    path = "/api/interview/start",
    responses(
        (status = 200, description = "Questions generated and first question presented", body = Json<serde_json::Value>),
        (status = 400, description = "Invalid contact details"),
        (status = 409, description = "Interview already started")
    )
)]
#[axum::debug_handler]
pub async fn start_interview(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.interview.start_interview().await?))
}

#[utoipa::path(
    put,
    path = "/api/interview/draft",
    request_body = DraftPayload,
    responses(
        (status = 204, description = "Draft stored"),
        (status = 409, description = "No question in progress")
    )
)]
#[axum::debug_handler]
pub async fn save_draft(
    State(state): State<AppState>,
    Json(payload): Json<DraftPayload>,
) -> Result<impl IntoResponse> {
    state.interview.save_draft(payload.answer).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/interview/answer",
    request_body = SubmitAnswerPayload,
    responses(
        (status = 200, description = "Submission outcome and the updated interview", body = Json<serde_json::Value>)
    )
)]
#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Json(payload): Json<SubmitAnswerPayload>,
) -> Result<impl IntoResponse> {
    let res = state
        .interview
        .submit_answer(&payload.answer, payload.question_id.as_deref())
        .await?;
    Ok(Json(res))
}

#[utoipa::path(
    post,
    path = "/api/interview/pause",
    responses(
        (status = 200, description = "Timer paused", body = Json<serde_json::Value>),
        (status = 409, description = "No question in progress")
    )
)]
#[axum::debug_handler]
pub async fn pause(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.interview.pause().await?))
}

#[utoipa::path(
    post,
    path = "/api/interview/resume",
    responses(
        (status = 200, description = "Timer resumed", body = Json<serde_json::Value>),
        (status = 409, description = "No question in progress")
    )
)]
#[axum::debug_handler]
pub async fn resume(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.interview.resume().await?))
}

#[utoipa::path(
    get,
    path = "/api/interview/session",
    responses(
        (status = 200, description = "Whether an unfinished session exists", body = SessionInfoResponse)
    )
)]
#[axum::debug_handler]
pub async fn session_info(State(state): State<AppState>) -> Result<Json<SessionInfoResponse>> {
    Ok(Json(state.interview.session_info().await))
}

#[utoipa::path(
    post,
    path = "/api/interview/session/continue",
    responses(
        (status = 200, description = "Session kept and timer re-armed", body = Json<serde_json::Value>)
    )
)]
#[axum::debug_handler]
pub async fn continue_session(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.interview.continue_session().await?))
}

#[utoipa::path(
    post,
    path = "/api/interview/session/new",
    responses(
        (status = 200, description = "Unfinished session discarded", body = Json<serde_json::Value>)
    )
)]
#[axum::debug_handler]
pub async fn start_new_session(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.interview.start_new_session().await?))
}
