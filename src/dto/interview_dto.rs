use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::candidate::{AnswerRecord, Candidate, CandidateStatus};
use crate::models::question::Question;
use crate::timer::TimerSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCandidatePayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub resume_file_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContactPayload {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DraftPayload {
    #[serde(default)]
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerPayload {
    #[serde(default)]
    pub answer: String,
    /// Defaults to the question currently on screen.
    pub question_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuestionsPayload {
    #[serde(default)]
    pub candidate_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateQuestionsResponse {
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateAnswersPayload {
    pub questions: Vec<Question>,
    #[serde(default)]
    pub answers: Vec<AnswerRecord>,
}

/// What the interviewee screen needs to render.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewView {
    pub candidate: Option<Candidate>,
    pub current_question: Option<Question>,
    pub question_number: Option<usize>,
    pub total_questions: usize,
    pub timer: TimerSnapshot,
    /// `m:ss` rendering of the remaining time.
    pub remaining_display: String,
    pub draft: String,
    pub is_submitting: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitStatus {
    AlreadySubmitting,
    Stale,
    Advanced,
    Completed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerResponse {
    pub status: SubmitStatus,
    pub interview: InterviewView,
    /// Set once the last answer has been evaluated.
    pub completed_candidate: Option<Candidate>,
}

/// Shown on startup so the interviewee can continue or start over.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfoResponse {
    pub has_active_session: bool,
    pub candidate_name: Option<String>,
    pub status: Option<String>,
    pub answered: usize,
    pub total_questions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSort {
    #[default]
    Score,
    Name,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateListQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub sort: CandidateSort,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub score: Option<u32>,
    pub status: CandidateStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Candidate> for CandidateSummary {
    fn from(c: &Candidate) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            email: c.email.clone(),
            phone: c.phone.clone(),
            score: c.score,
            status: c.status,
            completed_at: c.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateListResponse {
    pub items: Vec<CandidateSummary>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    pub question: Question,
    pub answer: Option<AnswerRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDetailResponse {
    pub candidate: Candidate,
    pub transcript: Vec<TranscriptEntry>,
}

impl From<Candidate> for CandidateDetailResponse {
    fn from(candidate: Candidate) -> Self {
        let transcript = candidate
            .questions
            .iter()
            .map(|q| TranscriptEntry {
                question: q.clone(),
                answer: candidate.answer_for(&q.id).cloned(),
            })
            .collect();
        Self {
            candidate,
            transcript,
        }
    }
}
