use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::message::{Message, MessageRole};
use crate::models::question::Question;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateStatus {
    Pending,
    InProgress,
    Completed,
}

impl CandidateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateStatus::Pending => "pending",
            CandidateStatus::InProgress => "in-progress",
            CandidateStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question_id: String,
    pub answer: String,
    pub time_spent: u32,
}

/// Progress of the timer for the current question, persisted so it survives a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub question_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    pub time_spent: u32,
    pub is_paused: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_file_name: Option<String>,
    pub messages: Vec<Message>,
    pub questions: Vec<Question>,
    pub current_question_index: usize,
    pub answers: Vec<AnswerRecord>,
    pub score: Option<u32>,
    pub summary: Option<String>,
    pub status: CandidateStatus,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub completed_at: Option<DateTime<Utc>>,
    pub timer_state: Option<TimerState>,
}

impl Candidate {
    pub fn new(name: String, email: String, phone: String, resume_file_name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            phone,
            resume_file_name,
            messages: Vec::new(),
            questions: Vec::new(),
            current_question_index: 0,
            answers: Vec::new(),
            score: None,
            summary: None,
            status: CandidateStatus::Pending,
            started_at: None,
            completed_at: None,
            timer_state: None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        if self.status != CandidateStatus::InProgress {
            return None;
        }
        self.questions.get(self.current_question_index)
    }

    pub fn is_last_question(&self) -> bool {
        !self.questions.is_empty() && self.current_question_index + 1 == self.questions.len()
    }

    /// All answers are recorded but the evaluation has not been committed yet.
    pub fn awaiting_evaluation(&self) -> bool {
        self.status == CandidateStatus::InProgress
            && !self.questions.is_empty()
            && self.current_question_index >= self.questions.len()
    }

    pub fn push_message(&mut self, role: MessageRole, content: impl Into<String>) {
        self.messages.push(Message::new(role, content));
    }

    pub fn assign_questions(&mut self, questions: Vec<Question>) -> Result<()> {
        if self.status != CandidateStatus::Pending {
            return Err(Error::Conflict(format!(
                "Questions can only be assigned to a pending candidate (status: {})",
                self.status.as_str()
            )));
        }
        if questions.is_empty() {
            return Err(Error::BadRequest("An interview needs at least one question".into()));
        }
        self.questions = questions;
        self.current_question_index = 0;
        self.answers.clear();
        self.timer_state = None;
        self.status = CandidateStatus::InProgress;
        self.started_at = Some(crate::utils::time::now());
        Ok(())
    }

    /// Appends the answer for the current question and moves to the next one.
    pub fn record_answer(&mut self, question_id: &str, answer: String, time_spent: u32) -> Result<()> {
        let current = self
            .current_question()
            .ok_or_else(|| Error::Conflict("No question is awaiting an answer".into()))?;
        if current.id != question_id {
            return Err(Error::Conflict(format!(
                "Question {} is not the current question ({})",
                question_id, current.id
            )));
        }
        self.answers.push(AnswerRecord {
            question_id: question_id.to_string(),
            answer,
            time_spent,
        });
        self.advance();
        Ok(())
    }

    fn advance(&mut self) {
        self.current_question_index = (self.current_question_index + 1).min(self.questions.len());
        self.timer_state = None;
    }

    pub fn complete(&mut self, score: u32, summary: String) -> Result<()> {
        if self.status != CandidateStatus::InProgress {
            return Err(Error::Conflict(format!(
                "Only an in-progress interview can be completed (status: {})",
                self.status.as_str()
            )));
        }
        self.score = Some(score.min(100));
        self.summary = Some(summary);
        self.status = CandidateStatus::Completed;
        self.completed_at = Some(crate::utils::time::now());
        self.timer_state = None;
        Ok(())
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&AnswerRecord> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }
}
