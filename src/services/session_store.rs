use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::database::{MemoryStorage, PersistedState, SessionStorage};
use crate::error::{Error, Result};
use crate::models::candidate::{Candidate, CandidateStatus, TimerState};
use crate::models::message::MessageRole;
use crate::models::question::Question;

/// Holds the current candidate and the archive of completed ones.
///
/// Every mutation runs under one lock and is saved before it becomes visible;
/// when the save fails the previous state is kept.
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<Mutex<PersistedState>>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    pub async fn load(storage: Arc<dyn SessionStorage>) -> Result<Self> {
        let state = storage.load().await?.unwrap_or_default();
        if let Some(current) = &state.current_candidate {
            tracing::info!(
                candidate_id = %current.id,
                status = current.status.as_str(),
                question_index = current.current_question_index,
                "Restored interview session"
            );
        }
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            storage,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(Mutex::new(PersistedState::default())),
            storage: Arc::new(MemoryStorage::new()),
        }
    }

    async fn mutate<T>(&self, f: impl FnOnce(&mut PersistedState) -> Result<T>) -> Result<T> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        self.storage.save(&next).await?;
        *guard = next;
        Ok(out)
    }

    pub async fn create_candidate(
        &self,
        name: String,
        email: String,
        phone: String,
        resume_file_name: Option<String>,
    ) -> Result<Candidate> {
        self.mutate(|state| {
            let candidate = Candidate::new(name, email, phone, resume_file_name);
            if let Some(previous) = state.current_candidate.replace(candidate.clone()) {
                tracing::info!(candidate_id = %previous.id, "Discarding unfinished candidate");
            }
            Ok(candidate)
        })
        .await
    }

    pub async fn update_candidate_info(
        &self,
        name: String,
        email: String,
        phone: String,
    ) -> Result<Option<Candidate>> {
        self.mutate(|state| {
            Ok(state.current_candidate.as_mut().map(|c| {
                c.name = name;
                c.email = email;
                c.phone = phone;
                c.clone()
            }))
        })
        .await
    }

    pub async fn add_message(&self, role: MessageRole, content: impl Into<String>) -> Result<()> {
        let content = content.into();
        self.mutate(|state| {
            if let Some(c) = state.current_candidate.as_mut() {
                c.push_message(role, content);
            }
            Ok(())
        })
        .await
    }

    pub async fn set_questions(&self, questions: Vec<Question>) -> Result<Candidate> {
        self.mutate(|state| {
            let c = current_mut(state)?;
            c.assign_questions(questions)?;
            Ok(c.clone())
        })
        .await
    }

    /// Records the answer for the current question, echoes it into the chat
    /// and advances to the next question in a single step, so the index always
    /// equals the answer count and every user message has its answer record.
    pub async fn submit_answer(
        &self,
        question_id: &str,
        answer: String,
        time_spent: u32,
    ) -> Result<Candidate> {
        self.mutate(|state| {
            let c = current_mut(state)?;
            c.record_answer(question_id, answer.clone(), time_spent)?;
            c.push_message(MessageRole::User, answer);
            Ok(c.clone())
        })
        .await
    }

    /// Finalizes the current candidate and moves it to the archive.
    pub async fn complete_interview(&self, score: u32, summary: String) -> Result<Candidate> {
        self.mutate(|state| {
            let mut candidate = state
                .current_candidate
                .take()
                .ok_or_else(|| Error::NotFound("No active interview".into()))?;
            candidate.complete(score, summary)?;
            state.candidates.push(candidate.clone());
            Ok(candidate)
        })
        .await
    }

    pub async fn reset_current_interview(&self) -> Result<Option<Candidate>> {
        self.mutate(|state| Ok(state.current_candidate.take())).await
    }

    /// Keeps the restored session as it is.
    pub async fn continue_session(&self) -> Option<Candidate> {
        self.current_candidate().await
    }

    pub async fn start_new_session(&self) -> Result<Option<Candidate>> {
        self.reset_current_interview().await
    }

    /// Overwrites the timer state of the current candidate. Returns `false`
    /// without touching anything when there is no current candidate or the
    /// state belongs to a question that is not current.
    pub async fn update_timer_state(&self, timer_state: TimerState) -> Result<bool> {
        {
            let guard = self.state.lock().await;
            let current_question = guard
                .current_candidate
                .as_ref()
                .and_then(|c| c.current_question())
                .map(|q| q.id.as_str());
            if current_question != Some(timer_state.question_id.as_str()) {
                return Ok(false);
            }
        }
        self.mutate(|state| {
            let Some(c) = state.current_candidate.as_mut() else {
                return Ok(false);
            };
            if c.current_question().map(|q| q.id.as_str()) != Some(timer_state.question_id.as_str()) {
                return Ok(false);
            }
            c.timer_state = Some(timer_state);
            Ok(true)
        })
        .await
    }

    pub async fn clear_timer_state(&self) -> Result<()> {
        self.mutate(|state| {
            if let Some(c) = state.current_candidate.as_mut() {
                c.timer_state = None;
            }
            Ok(())
        })
        .await
    }

    pub async fn has_active_session(&self) -> bool {
        let guard = self.state.lock().await;
        guard
            .current_candidate
            .as_ref()
            .is_some_and(|c| c.status != CandidateStatus::Completed)
    }

    pub async fn current_candidate(&self) -> Option<Candidate> {
        self.state.lock().await.current_candidate.clone()
    }

    pub async fn candidates(&self) -> Vec<Candidate> {
        self.state.lock().await.candidates.clone()
    }

    /// Looks in the archive first, then at the current candidate.
    pub async fn find_candidate(&self, id: Uuid) -> Option<Candidate> {
        let guard = self.state.lock().await;
        guard
            .candidates
            .iter()
            .chain(guard.current_candidate.iter())
            .find(|c| c.id == id)
            .cloned()
    }
}

fn current_mut(state: &mut PersistedState) -> Result<&mut Candidate> {
    state
        .current_candidate
        .as_mut()
        .ok_or_else(|| Error::NotFound("No active interview".into()))
}
