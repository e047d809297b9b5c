use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::dto::interview_dto::{
    CreateCandidatePayload, InterviewView, SessionInfoResponse, SubmitAnswerResponse, SubmitStatus,
};
use crate::error::{Error, Result};
use crate::models::candidate::{Candidate, CandidateStatus, TimerState};
use crate::models::message::MessageRole;
use crate::models::question::Question;
use crate::services::ai_service::AIService;
use crate::services::session_store::SessionStore;
use crate::services::submission_guard::{SubmissionGuard, SubmitOutcome, NO_ANSWER_EXPIRED};
use crate::timer::{TimerController, TimerEvent, TimerWatch};
use crate::utils::time::{format_countdown, now};
use crate::utils::validation::{validate, ContactInfo};

pub const GENERATING_MESSAGE: &str = "Generating interview questions...";

/// Where an expiry came from, so a late one can be recognised.
#[derive(Debug, Clone, Copy)]
struct Expiry {
    epoch: u64,
    elapsed: u32,
}

#[derive(Debug, Default)]
struct Draft {
    question_id: Option<String>,
    text: String,
}

/// Drives one interviewee session: question presentation, the countdown,
/// manual and timed-out submissions, pause and resume.
pub struct InterviewService {
    store: SessionStore,
    ai: AIService,
    guard: SubmissionGuard,
    /// Held only for short bookkeeping, never across a model call.
    timer: Mutex<TimerController>,
    watch: TimerWatch,
    draft: StdMutex<Draft>,
}

impl InterviewService {
    /// The receiver carries timer events and must be handed to
    /// [`InterviewService::spawn_timer_worker`].
    pub fn new(store: SessionStore, ai: AIService) -> (Self, UnboundedReceiver<TimerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let timer = TimerController::new(Arc::new(tx));
        let service = Self {
            store,
            ai,
            guard: SubmissionGuard::new(),
            watch: timer.watch(),
            timer: Mutex::new(timer),
            draft: StdMutex::new(Draft::default()),
        };
        (service, rx)
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn spawn_timer_worker(self: &Arc<Self>, mut rx: UnboundedReceiver<TimerEvent>) -> JoinHandle<()> {
        let service = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let Some(service) = service.upgrade() else {
                    break;
                };
                if let Err(e) = service.handle_timer_event(event).await {
                    tracing::error!(error = ?e, "Failed to handle timer event");
                }
            }
            tracing::debug!("Timer worker stopped");
        })
    }

    /// Picks up a persisted session after a restart.
    pub async fn restore(&self) -> Result<()> {
        let mut timer = self.timer.lock().await;
        let Some(candidate) = self.store.current_candidate().await else {
            return Ok(());
        };
        if candidate.awaiting_evaluation() {
            timer.reset();
            drop(timer);
            tracing::info!(candidate_id = %candidate.id, "Finishing an evaluation left over from a previous run");
            SubmissionGuard::finish(&self.store, &self.ai).await?;
            return Ok(());
        }
        self.resync_timer(&mut timer).await
    }

    pub async fn create_candidate(&self, payload: CreateCandidatePayload) -> Result<Candidate> {
        let mut timer = self.timer.lock().await;
        timer.reset();
        self.guard.reset();
        self.clear_draft();
        let candidate = self
            .store
            .create_candidate(
                payload.name.trim().to_string(),
                payload.email.trim().to_lowercase(),
                payload.phone.trim().to_string(),
                payload.resume_file_name,
            )
            .await?;
        tracing::info!(candidate_id = %candidate.id, "Candidate created");
        Ok(candidate)
    }

    pub async fn update_candidate_info(&self, name: &str, email: &str, phone: &str) -> Result<Candidate> {
        let contact = ContactInfo::new(name, email, phone);
        validate(&contact)?;
        self.store
            .update_candidate_info(contact.name, contact.email, contact.phone)
            .await?
            .ok_or_else(|| Error::NotFound("No current candidate".into()))
    }

    pub async fn start_interview(&self) -> Result<InterviewView> {
        let candidate = self.pending_candidate().await?;
        let contact = ContactInfo::new(&candidate.name, &candidate.email, &candidate.phone);
        validate(&contact)?;
        self.store
            .update_candidate_info(contact.name.clone(), contact.email, contact.phone)
            .await?;

        self.store.add_message(MessageRole::System, GENERATING_MESSAGE).await?;
        let questions = self.ai.generate_questions(&contact.name).await;

        // Candidate changes go through the timer lock, so the check below holds
        // until the questions are stored.
        let mut timer = self.timer.lock().await;
        if self.pending_candidate().await?.id != candidate.id {
            return Err(Error::Conflict("Candidate changed while questions were generated".into()));
        }
        let candidate = self.store.set_questions(questions).await?;
        self.store
            .add_message(
                MessageRole::Assistant,
                format!(
                    "Great! I've prepared {} coding questions for you. Let's begin with question 1.",
                    candidate.questions.len()
                ),
            )
            .await?;

        let first = candidate
            .current_question()
            .cloned()
            .ok_or_else(|| Error::Internal("Interview started without questions".into()))?;
        self.store.add_message(MessageRole::Assistant, first.text.clone()).await?;
        tracing::info!(candidate_id = %candidate.id, questions = candidate.questions.len(), "Interview started");

        timer.reset();
        self.present(&mut timer, &first, 0, true).await?;
        drop(timer);
        Ok(self.view().await)
    }

    pub async fn save_draft(&self, answer: String) -> Result<()> {
        let question = self
            .current_question()
            .await
            .ok_or_else(|| Error::Conflict("No question in progress".into()))?;
        let mut draft = self.draft.lock().unwrap_or_else(PoisonError::into_inner);
        draft.question_id = Some(question.id);
        draft.text = answer;
        Ok(())
    }

    pub async fn submit_answer(&self, answer: &str, question_id: Option<&str>) -> Result<SubmitAnswerResponse> {
        let outcome = self.submit(question_id, answer, None).await?;
        let (status, completed_candidate) = match outcome {
            SubmitOutcome::AlreadySubmitting => (SubmitStatus::AlreadySubmitting, None),
            SubmitOutcome::Stale => (SubmitStatus::Stale, None),
            SubmitOutcome::Advanced { .. } => (SubmitStatus::Advanced, None),
            SubmitOutcome::Completed { candidate } => (SubmitStatus::Completed, Some(candidate)),
        };
        Ok(SubmitAnswerResponse {
            status,
            interview: self.view().await,
            completed_candidate,
        })
    }

    pub async fn pause(&self) -> Result<InterviewView> {
        self.set_paused(true).await
    }

    pub async fn resume(&self) -> Result<InterviewView> {
        self.set_paused(false).await
    }

    pub async fn continue_session(&self) -> Result<InterviewView> {
        let mut timer = self.timer.lock().await;
        if let Some(candidate) = self.store.continue_session().await {
            tracing::info!(candidate_id = %candidate.id, "Continuing previous session");
            self.resync_timer(&mut timer).await?;
        }
        drop(timer);
        Ok(self.view().await)
    }

    pub async fn start_new_session(&self) -> Result<InterviewView> {
        let mut timer = self.timer.lock().await;
        timer.reset();
        self.guard.reset();
        self.clear_draft();
        if let Some(discarded) = self.store.start_new_session().await? {
            tracing::info!(candidate_id = %discarded.id, "Discarded unfinished session");
        }
        drop(timer);
        Ok(self.view().await)
    }

    pub async fn current(&self) -> InterviewView {
        self.view().await
    }

    pub async fn session_info(&self) -> SessionInfoResponse {
        let candidate = self.store.current_candidate().await;
        SessionInfoResponse {
            has_active_session: self.store.has_active_session().await,
            candidate_name: candidate.as_ref().map(|c| c.name.clone()),
            status: candidate.as_ref().map(|c| c.status.as_str().to_string()),
            answered: candidate.as_ref().map(|c| c.answers.len()).unwrap_or(0),
            total_questions: candidate.as_ref().map(|c| c.questions.len()).unwrap_or(0),
        }
    }

    async fn handle_timer_event(&self, event: TimerEvent) -> Result<()> {
        match event {
            TimerEvent::Tick {
                epoch,
                question_id,
                elapsed,
            } => {
                let timer = self.timer.lock().await;
                if epoch != timer.epoch() || !timer.snapshot().active {
                    return Ok(());
                }
                self.store
                    .update_timer_state(TimerState {
                        question_id,
                        start_time: now() - chrono::Duration::seconds(i64::from(elapsed)),
                        time_spent: elapsed,
                        is_paused: false,
                    })
                    .await?;
            }
            TimerEvent::Expired {
                epoch,
                question_id,
                elapsed,
            } => {
                tracing::info!(question_id = %question_id, elapsed, "Question time expired");
                let answer = self
                    .draft_for(&question_id)
                    .unwrap_or_else(|| NO_ANSWER_EXPIRED.to_string());
                self.submit(Some(&question_id), &answer, Some(Expiry { epoch, elapsed }))
                    .await?;
            }
        }
        Ok(())
    }

    /// Stops the countdown, hands the answer to the guard without holding the
    /// timer lock, then moves the timer to wherever the store ended up.
    async fn submit(
        &self,
        question_id: Option<&str>,
        answer: &str,
        expiry: Option<Expiry>,
    ) -> Result<SubmitOutcome> {
        let (question, elapsed, epoch, was_ticking) = {
            let mut timer = self.timer.lock().await;
            if expiry.is_some_and(|e| e.epoch != timer.epoch()) {
                tracing::debug!(question_id, "Dropping expiry from a previous question");
                return Ok(SubmitOutcome::Stale);
            }
            let Some(candidate) = self.store.current_candidate().await else {
                return Ok(SubmitOutcome::Stale);
            };
            let Some(question) = candidate.current_question().cloned() else {
                return Ok(SubmitOutcome::Stale);
            };
            if question_id.is_some_and(|id| id != question.id) {
                return Ok(SubmitOutcome::Stale);
            }

            let elapsed = match expiry {
                Some(e) => e.elapsed,
                None => Self::elapsed_for(&timer, &candidate, &question),
            };
            let was_ticking = timer.is_ticking();
            timer.stop();
            (question, elapsed, timer.epoch(), was_ticking)
        };

        let result = self
            .guard
            .submit(&self.store, &self.ai, &question.id, answer, elapsed)
            .await;

        let mut timer = self.timer.lock().await;
        if timer.epoch() != epoch {
            // A new candidate or session took over while the answer was recorded.
            return result;
        }
        match result {
            Ok(SubmitOutcome::Advanced { candidate, next }) => {
                self.present(&mut timer, &next, 0, true).await?;
                Ok(SubmitOutcome::Advanced { candidate, next })
            }
            Ok(SubmitOutcome::Completed { candidate }) => {
                timer.reset();
                self.clear_draft();
                Ok(SubmitOutcome::Completed { candidate })
            }
            Ok(other) => {
                if was_ticking {
                    timer.set_active(true);
                }
                Ok(other)
            }
            Err(e) if expiry.is_some() => {
                tracing::warn!(question_id = %question.id, error = ?e, "Expiry not recorded, retrying on the next tick");
                if !timer.rearm_expiry() {
                    if let Err(resync) = self.resync_timer(&mut timer).await {
                        tracing::error!(error = ?resync, "Failed to re-arm timer after a failed expiry");
                    }
                }
                Err(e)
            }
            Err(e) => {
                if let Err(resync) = self.resync_timer(&mut timer).await {
                    tracing::error!(error = ?resync, "Failed to re-arm timer after a failed submission");
                }
                Err(e)
            }
        }
    }

    async fn set_paused(&self, paused: bool) -> Result<InterviewView> {
        let mut timer = self.timer.lock().await;
        let candidate = self.store.current_candidate().await;
        let question = candidate
            .as_ref()
            .and_then(|c| c.current_question().cloned())
            .ok_or_else(|| Error::Conflict("No question in progress".into()))?;
        if self.guard.is_submitting() {
            return Err(Error::Conflict("An answer is being submitted".into()));
        }
        if timer.question_id().as_deref() != Some(question.id.as_str()) {
            self.resync_timer(&mut timer).await?;
        }

        timer.set_active(!paused);
        let elapsed = timer.elapsed();
        self.store
            .update_timer_state(TimerState {
                question_id: question.id.clone(),
                start_time: now() - chrono::Duration::seconds(i64::from(elapsed)),
                time_spent: elapsed,
                is_paused: paused,
            })
            .await?;
        tracing::info!(question_id = %question.id, elapsed, paused, "Timer toggled");
        drop(timer);
        Ok(self.view().await)
    }

    /// Arms the guard and the timer for `question` and persists the starting point.
    async fn present(
        &self,
        timer: &mut TimerController,
        question: &Question,
        elapsed: u32,
        active: bool,
    ) -> Result<()> {
        self.guard.reset();
        {
            let mut draft = self.draft.lock().unwrap_or_else(PoisonError::into_inner);
            if draft.question_id.as_deref() != Some(question.id.as_str()) {
                *draft = Draft {
                    question_id: Some(question.id.clone()),
                    text: String::new(),
                };
            }
        }
        timer.start(&question.id, question.time_limit, elapsed, active)?;
        let time_spent = elapsed.min(question.time_limit);
        self.store
            .update_timer_state(TimerState {
                question_id: question.id.clone(),
                start_time: now() - chrono::Duration::seconds(i64::from(time_spent)),
                time_spent,
                is_paused: !active,
            })
            .await?;
        Ok(())
    }

    /// Points the timer at whatever question is current in the store.
    async fn resync_timer(&self, timer: &mut TimerController) -> Result<()> {
        let candidate = self.store.current_candidate().await;
        let Some((candidate, question)) = candidate
            .as_ref()
            .and_then(|c| c.current_question().cloned().map(|q| (c, q)))
        else {
            timer.reset();
            return Ok(());
        };

        let paused = candidate
            .timer_state
            .as_ref()
            .filter(|ts| ts.question_id == question.id)
            .is_some_and(|ts| ts.is_paused);
        let elapsed = Self::elapsed_for(timer, candidate, &question);
        tracing::info!(
            candidate_id = %candidate.id,
            question_id = %question.id,
            elapsed,
            paused,
            "Resuming question timer"
        );
        self.present(timer, &question, elapsed, !paused).await
    }

    /// Live elapsed time when the timer tracks `question`, otherwise what was persisted.
    fn elapsed_for(timer: &TimerController, candidate: &Candidate, question: &Question) -> u32 {
        if timer.question_id().as_deref() == Some(question.id.as_str()) {
            return timer.elapsed();
        }
        candidate
            .timer_state
            .as_ref()
            .filter(|ts| ts.question_id == question.id)
            .map(|ts| ts.time_spent)
            .unwrap_or(0)
    }

    async fn current_question(&self) -> Option<Question> {
        self.store
            .current_candidate()
            .await
            .and_then(|c| c.current_question().cloned())
    }

    /// The saved draft stays in place until the next question is presented,
    /// so a failed expiry can use it again.
    fn draft_for(&self, question_id: &str) -> Option<String> {
        let draft = self.draft.lock().unwrap_or_else(PoisonError::into_inner);
        if draft.question_id.as_deref() != Some(question_id) || draft.text.trim().is_empty() {
            return None;
        }
        Some(draft.text.clone())
    }

    fn clear_draft(&self) {
        *self.draft.lock().unwrap_or_else(PoisonError::into_inner) = Draft::default();
    }

    async fn pending_candidate(&self) -> Result<Candidate> {
        let candidate = self
            .store
            .current_candidate()
            .await
            .ok_or_else(|| Error::NotFound("No current candidate".into()))?;
        if candidate.status != CandidateStatus::Pending {
            return Err(Error::Conflict(format!(
                "Interview cannot be started (status: {})",
                candidate.status.as_str()
            )));
        }
        Ok(candidate)
    }

    async fn view(&self) -> InterviewView {
        let candidate = self.store.current_candidate().await;
        let current_question = candidate.as_ref().and_then(|c| c.current_question().cloned());
        let snapshot = self.watch.snapshot();
        let draft = {
            let draft = self.draft.lock().unwrap_or_else(PoisonError::into_inner);
            match (&current_question, draft.question_id.as_deref()) {
                (Some(q), Some(id)) if q.id == id => draft.text.clone(),
                _ => String::new(),
            }
        };
        InterviewView {
            question_number: current_question
                .as_ref()
                .and(candidate.as_ref())
                .map(|c| c.current_question_index + 1),
            total_questions: candidate.as_ref().map(|c| c.questions.len()).unwrap_or(0),
            remaining_display: format_countdown(snapshot.remaining),
            timer: snapshot,
            is_submitting: self.guard.is_submitting(),
            candidate,
            current_question,
            draft,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryStorage, PersistedState, SessionStorage};
    use crate::services::ai_service::ChatCompletion;
    use crate::services::submission_guard::NO_ANSWER;
    use async_trait::async_trait;
    use serde_json::Value as JsonValue;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn service_with(store: SessionStore) -> Arc<InterviewService> {
        let (svc, rx) = InterviewService::new(store, AIService::offline());
        let svc = Arc::new(svc);
        svc.spawn_timer_worker(rx);
        svc
    }

    fn payload(phone: &str) -> CreateCandidatePayload {
        CreateCandidatePayload {
            name: "Ada Lovelace".into(),
            email: "Ada@Example.com".into(),
            phone: phone.into(),
            resume_file_name: Some("ada.pdf".into()),
        }
    }

    async fn started() -> Arc<InterviewService> {
        let svc = service_with(SessionStore::in_memory());
        svc.create_candidate(payload("+44 20 7946 0958")).await.unwrap();
        svc.start_interview().await.unwrap();
        svc
    }

    /// Sleeps for the given number of tenths of a second.
    async fn wait(tenths: u64) {
        tokio::time::sleep(Duration::from_millis(tenths * 100)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_presents_first_question() {
        let svc = started().await;
        let view = svc.current().await;
        let candidate = view.candidate.unwrap();
        assert_eq!(candidate.status, CandidateStatus::InProgress);
        assert_eq!(candidate.email, "ada@example.com");
        assert_eq!(view.current_question.unwrap().id, "q1");
        assert_eq!(view.question_number, Some(1));
        assert_eq!(view.total_questions, 6);
        assert!(view.timer.active);
        assert_eq!(view.remaining_display, "0:20");
        assert_eq!(candidate.messages[0].content, GENERATING_MESSAGE);
        assert_eq!(candidate.timer_state.unwrap().question_id, "q1");
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_contact_blocks_start() {
        let svc = service_with(SessionStore::in_memory());
        svc.create_candidate(payload("12-34")).await.unwrap();
        assert!(matches!(svc.start_interview().await, Err(Error::Validation(_))));
        let c = svc.store().current_candidate().await.unwrap();
        assert_eq!(c.status, CandidateStatus::Pending);
        assert!(c.questions.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn blank_answers_complete_the_interview() {
        let svc = started().await;
        for i in 1..=6 {
            let res = svc.submit_answer("", None).await.unwrap();
            if i < 6 {
                assert_eq!(res.status, SubmitStatus::Advanced);
            } else {
                assert_eq!(res.status, SubmitStatus::Completed);
            }
        }

        let archived = svc.store().candidates().await;
        assert_eq!(archived.len(), 1);
        let c = &archived[0];
        assert_eq!(c.status, CandidateStatus::Completed);
        assert_eq!(c.answers.len(), 6);
        assert!(c.answers.iter().all(|a| a.answer == NO_ANSWER));
        assert!(c.score.unwrap() <= 100);
        assert!(svc.store().current_candidate().await.is_none());
        assert!(!svc.current().await.timer.active);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_submits_sentinel_and_advances() {
        let svc = started().await;
        wait(205).await;

        let c = svc.store().current_candidate().await.unwrap();
        assert_eq!(c.answers.len(), 1);
        assert_eq!(c.answers[0].answer, NO_ANSWER_EXPIRED);
        assert_eq!(c.answers[0].time_spent, 20);
        assert_eq!(c.current_question().unwrap().id, "q2");
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_uses_draft() {
        let svc = started().await;
        svc.save_draft("useState".into()).await.unwrap();
        assert_eq!(svc.current().await.draft, "useState");
        wait(205).await;

        let c = svc.store().current_candidate().await.unwrap();
        assert_eq!(c.answers[0].answer, "useState");
        assert_eq!(svc.current().await.draft, "");
    }

    #[tokio::test(start_paused = true)]
    async fn pause_holds_the_clock() {
        let svc = started().await;
        wait(55).await;

        let view = svc.pause().await.unwrap();
        assert_eq!(view.timer.elapsed, 5);
        assert!(!view.timer.active);
        let ts = view.candidate.unwrap().timer_state.unwrap();
        assert!(ts.is_paused);
        assert_eq!(ts.time_spent, 5);

        wait(600).await;
        let c = svc.store().current_candidate().await.unwrap();
        assert!(c.answers.is_empty());

        svc.resume().await.unwrap();
        wait(155).await;
        let c = svc.store().current_candidate().await.unwrap();
        assert_eq!(c.answers.len(), 1);
        assert_eq!(c.answers[0].time_spent, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_question_id_is_ignored() {
        let svc = started().await;
        let res = svc.submit_answer("early", Some("q4")).await.unwrap();
        assert_eq!(res.status, SubmitStatus::Stale);
        assert!(res.interview.timer.active);
        assert!(svc.store().current_candidate().await.unwrap().answers.is_empty());
    }

    async fn store_at_q3(time_spent: u32, is_paused: bool) -> SessionStore {
        let store = SessionStore::load(Arc::new(MemoryStorage::new())).await.unwrap();
        store
            .create_candidate("Ada".into(), "ada@example.com".into(), "5550100".into(), None)
            .await
            .unwrap();
        store.set_questions(AIService::fallback_questions()).await.unwrap();
        store.submit_answer("q1", "useState".into(), 4).await.unwrap();
        store.submit_answer("q2", "fs".into(), 6).await.unwrap();
        store
            .update_timer_state(TimerState {
                question_id: "q3".into(),
                start_time: now(),
                time_spent,
                is_paused,
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test(start_paused = true)]
    async fn restore_continues_from_saved_time() {
        let svc = service_with(store_at_q3(45, false).await);
        svc.restore().await.unwrap();
        let view = svc.current().await;
        assert_eq!(view.timer.elapsed, 45);
        assert!(view.timer.active);

        wait(145).await;
        assert_eq!(svc.store().current_candidate().await.unwrap().answers.len(), 2);

        wait(10).await;
        let c = svc.store().current_candidate().await.unwrap();
        assert_eq!(c.answers.len(), 3);
        assert_eq!(c.answers[2].question_id, "q3");
        assert_eq!(c.answers[2].time_spent, 60);
    }

    #[tokio::test(start_paused = true)]
    async fn restore_keeps_pause() {
        let svc = service_with(store_at_q3(30, true).await);
        svc.restore().await.unwrap();
        wait(900).await;
        let view = svc.current().await;
        assert!(!view.timer.active);
        assert_eq!(view.timer.elapsed, 30);

        let view = svc.resume().await.unwrap();
        assert!(view.timer.active);
        assert!(!view.candidate.unwrap().timer_state.unwrap().is_paused);
    }

    #[tokio::test(start_paused = true)]
    async fn restore_finishes_pending_evaluation() {
        let store = SessionStore::in_memory();
        store
            .create_candidate("Ada".into(), "ada@example.com".into(), "5550100".into(), None)
            .await
            .unwrap();
        store.set_questions(AIService::fallback_questions()).await.unwrap();
        for q in AIService::fallback_questions() {
            store.submit_answer(&q.id, "answer".into(), 1).await.unwrap();
        }

        let svc = service_with(store);
        svc.restore().await.unwrap();
        assert!(svc.store().current_candidate().await.is_none());
        assert_eq!(svc.store().candidates().await[0].status, CandidateStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn new_session_discards_current() {
        let svc = started().await;
        let info = svc.session_info().await;
        assert!(info.has_active_session);
        assert_eq!(info.total_questions, 6);

        let view = svc.start_new_session().await.unwrap();
        assert!(view.candidate.is_none());
        assert!(!view.timer.active);
        wait(300).await;
        assert!(svc.store().current_candidate().await.is_none());
        assert!(!svc.session_info().await.has_active_session);
    }

    #[tokio::test(start_paused = true)]
    async fn overdue_paused_restore_stores_capped_time() {
        let svc = service_with(store_at_q3(75, true).await);
        svc.restore().await.unwrap();
        let ts = svc.store().current_candidate().await.unwrap().timer_state.unwrap();
        assert_eq!(ts.question_id, "q3");
        assert_eq!(ts.time_spent, 60);
        assert!(ts.is_paused);
        assert_eq!(svc.current().await.remaining_display, "0:00");
    }

    /// Memory storage whose saves can be switched off.
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        failing: AtomicBool,
    }

    #[async_trait]
    impl SessionStorage for FlakyStorage {
        async fn load(&self) -> Result<Option<PersistedState>> {
            self.inner.load().await
        }

        async fn save(&self, state: &PersistedState) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(Error::Internal("storage unavailable".into()));
            }
            self.inner.save(state).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_is_retried_after_storage_recovers() {
        let storage = Arc::new(FlakyStorage::default());
        let svc = service_with(SessionStore::load(storage.clone()).await.unwrap());
        svc.create_candidate(payload("+44 20 7946 0958")).await.unwrap();
        svc.start_interview().await.unwrap();
        svc.save_draft("useState".into()).await.unwrap();

        wait(195).await;
        storage.failing.store(true, Ordering::SeqCst);
        wait(20).await;
        let c = svc.store().current_candidate().await.unwrap();
        assert!(c.answers.is_empty());
        assert_eq!(c.current_question().unwrap().id, "q1");

        storage.failing.store(false, Ordering::SeqCst);
        wait(10).await;
        let c = svc.store().current_candidate().await.unwrap();
        assert_eq!(c.answers.len(), 1);
        assert_eq!(c.answers[0].answer, "useState");
        assert_eq!(c.answers[0].time_spent, 20);
        assert_eq!(c.current_question().unwrap().id, "q2");
        let view = svc.current().await;
        assert!(view.timer.active);
        assert_eq!(view.timer.elapsed, 0);
        assert!(!view.timer.expired);
    }

    /// Fails every call, and once `hold` is set waits for `release` first.
    #[derive(Default)]
    struct HeldChat {
        hold: AtomicBool,
        release: Notify,
    }

    #[async_trait]
    impl ChatCompletion for HeldChat {
        async fn complete_json(&self, _payload: JsonValue) -> Result<JsonValue> {
            if self.hold.load(Ordering::SeqCst) {
                self.release.notified().await;
            }
            Err(Error::Internal("model unavailable".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn state_stays_readable_during_final_evaluation() {
        let chat = Arc::new(HeldChat::default());
        let (svc, rx) = InterviewService::new(
            SessionStore::in_memory(),
            AIService::with_chat(chat.clone(), "test-model"),
        );
        let svc = Arc::new(svc);
        svc.spawn_timer_worker(rx);
        svc.create_candidate(payload("+44 20 7946 0958")).await.unwrap();
        svc.start_interview().await.unwrap();
        for _ in 1..6 {
            svc.submit_answer("answer", None).await.unwrap();
        }

        chat.hold.store(true, Ordering::SeqCst);
        let last = tokio::spawn({
            let svc = Arc::clone(&svc);
            async move { svc.submit_answer("last", None).await }
        });
        wait(1).await;

        let view = tokio::time::timeout(Duration::from_secs(1), svc.current())
            .await
            .expect("current view while evaluating");
        assert!(view.is_submitting);
        assert!(view.current_question.is_none());
        assert_eq!(view.candidate.unwrap().answers.len(), 6);
        let paused = tokio::time::timeout(Duration::from_secs(1), svc.pause())
            .await
            .expect("pause while evaluating");
        assert!(matches!(paused, Err(Error::Conflict(_))));
        assert!(!last.is_finished());

        chat.release.notify_one();
        let res = last.await.unwrap().unwrap();
        assert_eq!(res.status, SubmitStatus::Completed);
        assert!(svc.store().current_candidate().await.is_none());
    }
}
