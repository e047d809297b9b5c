use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};

use crate::error::{Error, Result};
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/resume/parse",
    responses(
        (status = 200, description = "Contact details found in the resume", body = Json<serde_json::Value>),
        (status = 400, description = "Missing or unsupported file")
    )
)]
#[axum::debug_handler]
pub async fn parse_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("resume") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;
        tracing::info!(
            file_name = file_name.as_deref().unwrap_or(""),
            size = data.len(),
            "Parsing uploaded resume"
        );
        let details = state
            .resume_service
            .parse(file_name.as_deref(), content_type.as_deref(), data)
            .await?;
        return Ok(Json(details));
    }
    Err(Error::BadRequest("Missing 'resume' file field".into()))
}
