use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use interview_backend::{
    routes, services::ai_service::AIService, services::session_store::SessionStore, AppState,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

fn app() -> Router {
    let state = AppState::new(SessionStore::in_memory(), AIService::offline());
    routes::api_router(1000).with_state(state)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<JsonValue>) -> (StatusCode, JsonValue) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            req = req.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let body = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create_and_start(app: &Router) -> JsonValue {
    let (status, candidate) = call(
        app,
        "POST",
        "/api/interview/candidates",
        Some(json!({
            "name": "Grace Hopper",
            "email": "grace@example.com",
            "phone": "+1 (555) 010-0000",
            "resumeFileName": "grace.pdf"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(candidate["status"], "pending");

    let (status, view) = call(app, "POST", "/api/interview/start", None).await;
    assert_eq!(status, StatusCode::OK, "{view}");
    view
}

#[tokio::test]
async fn interview_flow_end_to_end() {
    let app = app();
    let view = create_and_start(&app).await;
    assert_eq!(view["currentQuestion"]["id"], "q1");
    assert_eq!(view["currentQuestion"]["timeLimit"], 20);
    assert_eq!(view["totalQuestions"], 6);
    assert_eq!(view["timer"]["active"], true);

    let (status, _) = call(&app, "PUT", "/api/interview/draft", Some(json!({"answer": "useSt"}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, view) = call(&app, "GET", "/api/interview/current", None).await;
    assert_eq!(view["draft"], "useSt");

    let mut last = JsonValue::Null;
    for _ in 0..6 {
        let (status, body) = call(&app, "POST", "/api/interview/answer", Some(json!({"answer": ""}))).await;
        assert_eq!(status, StatusCode::OK);
        last = body;
    }
    assert_eq!(last["status"], "completed");
    let completed = &last["completedCandidate"];
    assert_eq!(completed["status"], "completed");
    let score = completed["score"].as_u64().unwrap();
    assert!(score <= 100);
    assert!(last["interview"]["candidate"].is_null());

    let (status, list) = call(&app, "GET", "/api/interviewer/candidates?sort=score", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);
    let id = list["items"][0]["id"].as_str().unwrap().to_string();

    let (status, detail) = call(&app, "GET", &format!("/api/interviewer/candidates/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let transcript = detail["transcript"].as_array().unwrap();
    assert_eq!(transcript.len(), 6);
    assert!(transcript
        .iter()
        .all(|e| e["answer"]["answer"] == "No answer provided"));
    let limits: Vec<u64> = transcript
        .iter()
        .map(|e| e["question"]["timeLimit"].as_u64().unwrap())
        .collect();
    assert_eq!(limits, vec![20, 20, 60, 60, 120, 120]);

    let (_, info) = call(&app, "GET", "/api/interview/session", None).await;
    assert_eq!(info["hasActiveSession"], false);
}

#[tokio::test]
async fn stale_and_explicit_question_ids() {
    let app = app();
    create_and_start(&app).await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/interview/answer",
        Some(json!({"answer": "fs", "questionId": "q2"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "stale");

    let (_, body) = call(
        &app,
        "POST",
        "/api/interview/answer",
        Some(json!({"answer": "useState", "questionId": "q1"})),
    )
    .await;
    assert_eq!(body["status"], "advanced");
    assert_eq!(body["interview"]["currentQuestion"]["id"], "q2");
    assert_eq!(body["interview"]["candidate"]["answers"][0]["answer"], "useState");
}

#[tokio::test]
async fn invalid_contact_is_rejected() {
    let app = app();
    let (status, _) = call(
        &app,
        "POST",
        "/api/interview/candidates",
        Some(json!({"name": "Al", "email": "al@example.com", "phone": "12-34"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(&app, "POST", "/api/interview/start", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("phone"));

    let (status, _) = call(
        &app,
        "PATCH",
        "/api/interview/current",
        Some(json!({"name": "Al", "email": "nope", "phone": "+91 98765 43210"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, candidate) = call(
        &app,
        "PATCH",
        "/api/interview/current",
        Some(json!({"name": "Al", "email": "AL@example.com", "phone": "+91 98765 43210"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(candidate["email"], "al@example.com");

    let (status, _) = call(&app, "POST", "/api/interview/start", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, "POST", "/api/interview/start", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn pause_resume_and_sessions() {
    let app = app();
    let (status, _) = call(&app, "POST", "/api/interview/pause", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    create_and_start(&app).await;
    let (status, view) = call(&app, "POST", "/api/interview/pause", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["timer"]["active"], false);
    assert_eq!(view["candidate"]["timerState"]["isPaused"], true);

    let (_, view) = call(&app, "POST", "/api/interview/resume", None).await;
    assert_eq!(view["timer"]["active"], true);

    let (_, info) = call(&app, "GET", "/api/interview/session", None).await;
    assert_eq!(info["hasActiveSession"], true);
    assert_eq!(info["candidateName"], "Grace Hopper");

    let (status, view) = call(&app, "POST", "/api/interview/session/continue", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["currentQuestion"]["id"], "q1");

    let (status, view) = call(&app, "POST", "/api/interview/session/new", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(view["candidate"].is_null());

    let (_, list) = call(&app, "GET", "/api/interviewer/candidates", None).await;
    assert_eq!(list["total"], 0);
}

#[tokio::test]
async fn unknown_candidate_is_not_found() {
    let app = app();
    let (status, body) = call(
        &app,
        "GET",
        "/api/interviewer/candidates/00000000-0000-0000-0000-000000000000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn health_and_openapi() {
    let app = app();
    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, doc) = call(&app, "GET", "/api/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/interview/start"].is_object());
}
