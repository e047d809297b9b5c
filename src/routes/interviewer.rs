use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::dto::interview_dto::{
    CandidateDetailResponse, CandidateListQuery, CandidateListResponse, CandidateSort,
    CandidateSummary,
};
use crate::error::{Error, Result};
use crate::models::candidate::Candidate;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/interviewer/candidates",
    params(
        ("search" = Option<String>, Query, description = "Matches name, email or phone"),
        ("sort" = Option<String>, Query, description = "score (default) or name")
    ),
    responses(
        (status = 200, description = "Completed candidates", body = Json<serde_json::Value>)
    )
)]
#[axum::debug_handler]
pub async fn list_candidates(
    State(state): State<AppState>,
    Query(query): Query<CandidateListQuery>,
) -> Result<impl IntoResponse> {
    let candidates = state.store.candidates().await;
    let items = filter_and_sort(&candidates, &query);
    Ok(Json(CandidateListResponse {
        total: items.len(),
        items,
    }))
}

#[utoipa::path(
    get,
    path = "/api/interviewer/candidates/{id}",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    responses(
        (status = 200, description = "Candidate with transcript", body = Json<serde_json::Value>),
        (status = 404, description = "Candidate not found")
    )
)]
#[axum::debug_handler]
pub async fn get_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let candidate = state
        .store
        .find_candidate(id)
        .await
        .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", id)))?;
    Ok(Json(CandidateDetailResponse::from(candidate)))
}

fn filter_and_sort(candidates: &[Candidate], query: &CandidateListQuery) -> Vec<CandidateSummary> {
    let needle = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let mut items: Vec<CandidateSummary> = candidates
        .iter()
        .filter(|c| match &needle {
            Some(n) => [&c.name, &c.email, &c.phone]
                .iter()
                .any(|field| field.to_lowercase().contains(n.as_str())),
            None => true,
        })
        .map(CandidateSummary::from)
        .collect();

    match query.sort {
        CandidateSort::Score => {
            items.sort_by(|a, b| b.score.unwrap_or(0).cmp(&a.score.unwrap_or(0)))
        }
        CandidateSort::Name => items.sort_by_key(|c| c.name.to_lowercase()),
    }
    items
}
