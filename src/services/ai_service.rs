use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::models::candidate::AnswerRecord;
use crate::models::question::{Difficulty, Question, QUESTIONS_PER_INTERVIEW, QUESTIONS_PER_TIER};
use crate::services::submission_guard::NO_ANSWER;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: u32,
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// A chat completion whose message content is a JSON document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete_json(&self, payload: JsonValue) -> Result<JsonValue>;
}

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, client: Client) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl ChatCompletion for OpenAiClient {
    async fn complete_json(&self, payload: JsonValue) -> Result<JsonValue> {
        let res = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(Duration::from_secs(60))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("OpenAI API Error {}: {}", status, text).into());
        }

        let body: JsonValue = res.json().await?;

        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .and_then(|s| serde_json::from_str(s.trim()).ok())
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response format").into())
    }
}

/// Language-model collaborator. Every call has a local fallback, so callers
/// never see an error from here.
#[derive(Clone)]
pub struct AIService {
    chat: Option<Arc<dyn ChatCompletion>>,
    model: String,
}

impl AIService {
    pub fn new(api_key: Option<String>, model: String, client: Client) -> Self {
        let chat = api_key
            .filter(|key| !key.trim().is_empty())
            .map(|key| Arc::new(OpenAiClient::new(key, client)) as Arc<dyn ChatCompletion>);
        if chat.is_none() {
            tracing::warn!("OPENAI_API_KEY not configured, using fallback questions and evaluation");
        }
        Self { chat, model }
    }

    pub fn with_chat(chat: Arc<dyn ChatCompletion>, model: impl Into<String>) -> Self {
        Self {
            chat: Some(chat),
            model: model.into(),
        }
    }

    /// No language model; every call answers with its fallback.
    pub fn offline() -> Self {
        Self {
            chat: None,
            model: String::new(),
        }
    }

    pub async fn generate_questions(&self, candidate_name: &str) -> Vec<Question> {
        let Some(chat) = &self.chat else {
            return Self::fallback_questions();
        };

        let system_prompt = r#"You are an expert technical interviewer specializing in React and Node.js.
Generate 6 interview questions with this exact distribution, in this order:
- 2 easy questions (20 seconds each): basic concepts, one-word or one-line answers
- 2 medium questions (60 seconds each): intermediate concepts, one-line answers
- 2 hard questions (120 seconds each): advanced or practical one-liners

Return a JSON object of the form:
{"questions": [{"id": "q1", "text": "...", "difficulty": "easy", "timeLimit": 20}]}"#;

        let payload = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": format!(
                    "Generate 6 interview questions for {} focusing on React and Node.js development.",
                    candidate_name
                )}
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.8
        });

        match chat.complete_json(payload).await {
            Ok(raw) => match Self::sanitize_questions(&raw) {
                Some(questions) => {
                    tracing::info!(count = questions.len(), "Generated interview questions");
                    questions
                }
                None => {
                    tracing::warn!("Generated questions did not match the tier layout, using fallback");
                    Self::fallback_questions()
                }
            },
            Err(e) => {
                tracing::error!(error = ?e, "Question generation failed");
                Self::fallback_questions()
            }
        }
    }

    pub async fn evaluate_answers(&self, questions: &[Question], answers: &[AnswerRecord]) -> Evaluation {
        let Some(chat) = &self.chat else {
            return Self::fallback_evaluation();
        };

        let system_prompt = r#"You are an expert technical interviewer evaluating React and Node.js interview answers.
Analyze the candidate's responses and provide:
1. A numerical score from 0-100
2. A summary covering overall performance, 2-3 specific strengths, 2-3 areas for improvement and a final recommendation.
Consider answer quality, completeness and time management.
Return JSON: {"score": <0-100>, "summary": "<summary>"}"#;

        let payload = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": format!(
                    "Evaluate these interview answers:\n\n{}",
                    Self::transcript(questions, answers)
                )}
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.7,
            "max_tokens": 800
        });

        match chat.complete_json(payload).await {
            Ok(raw) => Self::coerce_evaluation(&raw).unwrap_or_else(|| {
                tracing::warn!("Evaluation response was malformed, using fallback");
                Self::fallback_evaluation()
            }),
            Err(e) => {
                tracing::error!(error = ?e, "Answer evaluation failed");
                Self::fallback_evaluation()
            }
        }
    }

    /// `None` when no model is configured or the call failed.
    pub async fn extract_contact_details(&self, resume_text: &str) -> Option<ContactDetails> {
        let chat = self.chat.as_ref()?;

        let system_prompt = r#"You are an expert resume parser.
Extract the candidate's full name, email address and phone number from the resume text.
Handle international phone formats and unusual layouts.
Return ONLY a JSON object with exactly these fields: name, email, phone.
Use an empty string for anything that is not present."#;

        let payload = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": format!("Parse this resume:\n\n{}", resume_text)}
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.0
        });

        match chat.complete_json(payload).await {
            Ok(raw) => match serde_json::from_value::<ContactDetails>(raw) {
                Ok(details) => Some(details),
                Err(e) => {
                    tracing::warn!(error = %e, "Resume parse response was malformed");
                    None
                }
            },
            Err(e) => {
                tracing::error!(error = ?e, "Resume parsing failed");
                None
            }
        }
    }

    /// Accepts `{"questions": [...]}` or a bare array. Time limits and ids are
    /// derived from the tier; anything other than two questions per tier is rejected.
    pub fn sanitize_questions(raw: &JsonValue) -> Option<Vec<Question>> {
        let items = raw
            .get("questions")
            .and_then(|q| q.as_array())
            .or_else(|| raw.as_array())?;

        let mut by_tier: HashMap<Difficulty, Vec<String>> = HashMap::new();
        for item in items {
            let text = item
                .get("text")
                .or_else(|| item.get("question"))
                .and_then(|t| t.as_str())
                .map(str::trim)
                .filter(|t| !t.is_empty());
            let difficulty = item
                .get("difficulty")
                .and_then(|d| d.as_str())
                .and_then(Difficulty::parse);
            if let (Some(text), Some(difficulty)) = (text, difficulty) {
                by_tier.entry(difficulty).or_default().push(text.to_string());
            }
        }

        let mut questions = Vec::with_capacity(QUESTIONS_PER_INTERVIEW);
        for difficulty in Difficulty::ALL {
            let texts = by_tier.remove(&difficulty).unwrap_or_default();
            if texts.len() != QUESTIONS_PER_TIER {
                return None;
            }
            for text in texts {
                let id = format!("q{}", questions.len() + 1);
                questions.push(Question::new(id, text, difficulty));
            }
        }
        Some(questions)
    }

    fn coerce_evaluation(raw: &JsonValue) -> Option<Evaluation> {
        let score = match raw.get("score")? {
            JsonValue::Number(n) => n.as_f64()?,
            JsonValue::String(s) => s.trim().trim_end_matches("/100").trim().parse::<f64>().ok()?,
            _ => return None,
        };
        if !score.is_finite() {
            return None;
        }

        let summary = match raw.get("summary")? {
            JsonValue::String(s) => s.trim().to_string(),
            JsonValue::Object(_) => Self::render_structured_summary(raw.get("summary")?),
            _ => return None,
        };
        if summary.is_empty() {
            return None;
        }

        Some(Evaluation {
            score: score.round().clamp(0.0, 100.0) as u32,
            summary,
        })
    }

    fn render_structured_summary(summary: &JsonValue) -> String {
        let text = |key: &str| summary.get(key).and_then(|v| v.as_str()).unwrap_or("").trim().to_string();
        let list = |key: &str| -> Vec<String> {
            summary
                .get(key)
                .and_then(|v| v.as_array())
                .map(|a| a.iter().filter_map(|x| x.as_str()).map(|s| format!("- {}", s)).collect())
                .unwrap_or_default()
        };

        let mut sections = Vec::new();
        let overall = text("overallAssesment");
        if !overall.is_empty() {
            sections.push(overall);
        }
        let strengths = list("specificStrengths");
        if !strengths.is_empty() {
            sections.push(format!("Strengths:\n{}", strengths.join("\n")));
        }
        let improvements = list("areasOfImprovement");
        if !improvements.is_empty() {
            sections.push(format!("Areas for Improvement:\n{}", improvements.join("\n")));
        }
        let recommendation = text("finalRecommendation");
        if !recommendation.is_empty() {
            sections.push(recommendation);
        }
        sections.join("\n\n")
    }

    pub fn transcript(questions: &[Question], answers: &[AnswerRecord]) -> String {
        questions
            .iter()
            .enumerate()
            .map(|(idx, q)| {
                let answer = answers.iter().find(|a| a.question_id == q.id);
                format!(
                    "Question {} ({}): {}\nAnswer: {}\nTime spent: {}s / {}s",
                    idx + 1,
                    q.difficulty.as_str(),
                    q.text,
                    answer.map(|a| a.answer.as_str()).unwrap_or(NO_ANSWER),
                    answer.map(|a| a.time_spent).unwrap_or(0),
                    q.time_limit
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn fallback_questions() -> Vec<Question> {
        vec![
            Question::new(
                "q1",
                "Which React hook is used to manage local state in functional components?",
                Difficulty::Easy,
            ),
            Question::new(
                "q2",
                "In Node.js, which module is used to handle file system operations?",
                Difficulty::Easy,
            ),
            Question::new(
                "q3",
                "Which React hook allows you to perform side effects after rendering?",
                Difficulty::Medium,
            ),
            Question::new(
                "q4",
                "In Node.js, which method reads a file asynchronously and accepts a callback?",
                Difficulty::Medium,
            ),
            Question::new(
                "q5",
                "Which React API is used to memoize a component to prevent unnecessary re-renders?",
                Difficulty::Hard,
            ),
            Question::new(
                "q6",
                "In Node.js, which core module enables streaming of data in chunks?",
                Difficulty::Hard,
            ),
        ]
    }

    pub fn fallback_evaluation() -> Evaluation {
        let score = rand::thread_rng().gen_range(60..90);
        let summary = "The candidate showed a working understanding of full-stack development concepts.

Strengths:
- Good grasp of JavaScript fundamentals
- Clear explanation of React concepts
- Practical approach to problem-solving

Areas for Improvement:
- More detailed examples would strengthen the answers
- Time management on the harder questions
- API design could be more thorough

Overall, the candidate shows promise and would benefit from more experience with complex system design."
            .to_string();
        Evaluation { score, summary }
    }
}
