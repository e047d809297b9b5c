use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Result;
use crate::models::candidate::Candidate;
use crate::models::message::MessageRole;
use crate::models::question::Question;
use crate::services::ai_service::AIService;
use crate::services::session_store::SessionStore;

/// Recorded when a submitted answer is blank.
pub const NO_ANSWER: &str = "No answer provided";
/// Recorded when the timer runs out with nothing typed.
pub const NO_ANSWER_EXPIRED: &str = "No answer provided (time expired)";

pub const EVALUATING_MESSAGE: &str = "Evaluating your answers...";

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Another submission holds the latch; nothing was recorded.
    AlreadySubmitting,
    /// The question is no longer current; nothing was recorded.
    Stale,
    Advanced { candidate: Candidate, next: Question },
    Completed { candidate: Candidate },
}

/// Makes sure each question is answered exactly once, whether the answer
/// comes from the candidate or from the timer running out.
///
/// The latch is taken before anything is recorded and released when the next
/// question is presented, or immediately if recording fails.
#[derive(Debug, Default)]
pub struct SubmissionGuard {
    submitting: AtomicBool,
}

impl SubmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    /// Re-arms the guard for a freshly presented question.
    pub fn reset(&self) {
        self.submitting.store(false, Ordering::SeqCst);
    }

    fn try_acquire(&self) -> bool {
        self.submitting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub async fn submit(
        &self,
        store: &SessionStore,
        ai: &AIService,
        question_id: &str,
        answer: &str,
        elapsed: u32,
    ) -> Result<SubmitOutcome> {
        if !self.try_acquire() {
            tracing::debug!(question_id, "Submission already in flight");
            return Ok(SubmitOutcome::AlreadySubmitting);
        }

        match self.record(store, ai, question_id, answer, elapsed).await {
            Ok(outcome) => {
                if matches!(outcome, SubmitOutcome::Stale | SubmitOutcome::Advanced { .. }) {
                    self.reset();
                }
                Ok(outcome)
            }
            Err(e) => {
                self.reset();
                Err(e)
            }
        }
    }

    async fn record(
        &self,
        store: &SessionStore,
        ai: &AIService,
        question_id: &str,
        answer: &str,
        elapsed: u32,
    ) -> Result<SubmitOutcome> {
        let Some(question) = store
            .current_candidate()
            .await
            .and_then(|c| c.current_question().cloned())
            .filter(|q| q.id == question_id)
        else {
            tracing::debug!(question_id, "Ignoring submission for a question that is not current");
            return Ok(SubmitOutcome::Stale);
        };

        let answer = match answer.trim() {
            "" => NO_ANSWER,
            trimmed => trimmed,
        };
        let time_spent = elapsed.min(question.time_limit);

        let candidate = store
            .submit_answer(&question.id, answer.to_string(), time_spent)
            .await?;
        tracing::info!(
            candidate_id = %candidate.id,
            question_id,
            time_spent,
            "Answer recorded"
        );

        match candidate.current_question().cloned() {
            Some(next) => {
                store.add_message(MessageRole::Assistant, next.text.clone()).await?;
                Ok(SubmitOutcome::Advanced { candidate, next })
            }
            None => {
                let candidate = Self::finish(store, ai).await?;
                Ok(SubmitOutcome::Completed { candidate })
            }
        }
    }

    /// Evaluates every recorded answer and archives the candidate.
    pub async fn finish(store: &SessionStore, ai: &AIService) -> Result<Candidate> {
        store.add_message(MessageRole::Assistant, EVALUATING_MESSAGE).await?;
        let current = store
            .current_candidate()
            .await
            .ok_or_else(|| crate::error::Error::NotFound("No active interview".into()))?;

        let evaluation = ai.evaluate_answers(&current.questions, &current.answers).await;
        store
            .add_message(
                MessageRole::Assistant,
                format!(
                    "Interview completed! Your score: {}/100\n\n{}",
                    evaluation.score, evaluation.summary
                ),
            )
            .await?;
        let candidate = store
            .complete_interview(evaluation.score, evaluation.summary)
            .await?;
        tracing::info!(
            candidate_id = %candidate.id,
            score = evaluation.score,
            "Interview completed"
        );
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candidate::CandidateStatus;
    use crate::models::question::Difficulty;

    async fn started_store(questions: Vec<Question>) -> SessionStore {
        let store = SessionStore::in_memory();
        store
            .create_candidate("Ada".into(), "ada@example.com".into(), "5550100".into(), None)
            .await
            .unwrap();
        store.set_questions(questions).await.unwrap();
        store
    }

    fn two_questions() -> Vec<Question> {
        vec![
            Question::new("q1", "one", Difficulty::Easy),
            Question::new("q2", "two", Difficulty::Medium),
        ]
    }

    #[tokio::test]
    async fn blank_answer_gets_sentinel_and_advances() {
        let store = started_store(two_questions()).await;
        let guard = SubmissionGuard::new();
        let ai = AIService::offline();

        let outcome = guard.submit(&store, &ai, "q1", "   ", 7).await.unwrap();
        match outcome {
            SubmitOutcome::Advanced { candidate, next } => {
                assert_eq!(next.id, "q2");
                assert_eq!(candidate.answers[0].answer, NO_ANSWER);
                assert_eq!(candidate.answers[0].time_spent, 7);
                assert_eq!(candidate.messages.last().unwrap().content, "two");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!guard.is_submitting());
    }

    #[tokio::test]
    async fn time_spent_is_capped_at_limit() {
        let store = started_store(two_questions()).await;
        let guard = SubmissionGuard::new();
        guard
            .submit(&store, &AIService::offline(), "q1", NO_ANSWER_EXPIRED, 75)
            .await
            .unwrap();
        let c = store.current_candidate().await.unwrap();
        assert_eq!(c.answers[0].time_spent, 20);
        assert_eq!(c.answers[0].answer, NO_ANSWER_EXPIRED);
    }

    #[tokio::test]
    async fn stale_question_is_ignored() {
        let store = started_store(two_questions()).await;
        let guard = SubmissionGuard::new();
        let outcome = guard
            .submit(&store, &AIService::offline(), "q2", "early", 1)
            .await
            .unwrap();
        assert!(matches!(outcome, SubmitOutcome::Stale));
        assert!(store.current_candidate().await.unwrap().answers.is_empty());
        assert!(!guard.is_submitting());
    }

    #[tokio::test]
    async fn concurrent_submissions_record_once() {
        let store = started_store(two_questions()).await;
        let guard = SubmissionGuard::new();
        let ai = AIService::offline();

        let (a, b) = tokio::join!(
            guard.submit(&store, &ai, "q1", "typed", 5),
            guard.submit(&store, &ai, "q1", NO_ANSWER_EXPIRED, 20),
        );
        let outcomes = [a.unwrap(), b.unwrap()];
        let advanced = outcomes
            .iter()
            .filter(|o| matches!(o, SubmitOutcome::Advanced { .. }))
            .count();
        assert_eq!(advanced, 1);

        let c = store.current_candidate().await.unwrap();
        assert_eq!(c.answers.len(), 1);
        assert_eq!(c.current_question_index, 1);
    }

    #[tokio::test]
    async fn held_latch_rejects_submission() {
        let store = started_store(two_questions()).await;
        let guard = SubmissionGuard::new();
        assert!(guard.try_acquire());
        let outcome = guard
            .submit(&store, &AIService::offline(), "q1", "x", 1)
            .await
            .unwrap();
        assert!(matches!(outcome, SubmitOutcome::AlreadySubmitting));
        assert!(store.current_candidate().await.unwrap().answers.is_empty());
    }

    #[tokio::test]
    async fn last_answer_completes_interview() {
        let store = started_store(two_questions()).await;
        let guard = SubmissionGuard::new();
        let ai = AIService::offline();

        guard.submit(&store, &ai, "q1", "useState", 3).await.unwrap();
        let outcome = guard.submit(&store, &ai, "q2", "", 10).await.unwrap();
        let SubmitOutcome::Completed { candidate } = outcome else {
            panic!("interview should be completed");
        };
        assert_eq!(candidate.status, CandidateStatus::Completed);
        assert!((60..90).contains(&candidate.score.unwrap()));
        assert!(candidate
            .messages
            .iter()
            .any(|m| m.content == EVALUATING_MESSAGE));
        assert!(candidate
            .messages
            .last()
            .unwrap()
            .content
            .starts_with("Interview completed! Your score:"));
        assert!(store.current_candidate().await.is_none());
        assert_eq!(store.candidates().await.len(), 1);
        // Latch stays held until a new question is presented.
        assert!(guard.is_submitting());
    }
}
