use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;

use crate::dto::interview_dto::{
    ContactPayload, CreateCandidatePayload, DraftPayload, GenerateQuestionsPayload,
    SessionInfoResponse, SubmitAnswerPayload,
};
use crate::routes::{ai, interview, interviewer, resume};

#[derive(OpenApi)]
#[openapi(
    paths(
        ai::generate_questions,
        ai::evaluate_answers,
        resume::parse_resume,
        interview::create_candidate,
        interview::get_current,
        interview::update_current,
        interview::start_interview,
        interview::save_draft,
        interview::submit_answer,
        interview::pause,
        interview::resume,
        interview::session_info,
        interview::continue_session,
        interview::start_new_session,
        interviewer::list_candidates,
        interviewer::get_candidate,
    ),
    components(schemas(
        ContactPayload,
        CreateCandidatePayload,
        DraftPayload,
        GenerateQuestionsPayload,
        SessionInfoResponse,
        SubmitAnswerPayload,
    )),
    tags((name = "interview", description = "AI interview assistant"))
)]
pub struct ApiDoc;

#[axum::debug_handler]
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
