pub mod ai;
pub mod health;
pub mod interview;
pub mod interviewer;
pub mod openapi;
pub mod resume;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::middleware::rate_limit::{limit_requests, RateLimiter};
use crate::AppState;

/// Every API route, rate limited at `rps` requests per second. `/health` is not limited.
pub fn api_router(rps: u32) -> Router<AppState> {
    let api = Router::new()
        .route("/api/generate-questions", post(ai::generate_questions))
        .route("/api/evaluate-answers", post(ai::evaluate_answers))
        .route("/api/resume/parse", post(resume::parse_resume))
        .route("/api/interview/candidates", post(interview::create_candidate))
        .route(
            "/api/interview/current",
            get(interview::get_current).patch(interview::update_current),
        )
        .route("/api/interview/start", post(interview::start_interview))
        .route("/api/interview/draft", put(interview::save_draft))
        .route("/api/interview/answer", post(interview::submit_answer))
        .route("/api/interview/pause", post(interview::pause))
        .route("/api/interview/resume", post(interview::resume))
        .route("/api/interview/session", get(interview::session_info))
        .route(
            "/api/interview/session/continue",
            post(interview::continue_session),
        )
        .route("/api/interview/session/new", post(interview::start_new_session))
        .route("/api/interviewer/candidates", get(interviewer::list_candidates))
        .route(
            "/api/interviewer/candidates/:id",
            get(interviewer::get_candidate),
        )
        .route("/api/openapi.json", get(openapi::openapi_json))
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new(rps),
            limit_requests,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
}
