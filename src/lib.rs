pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod timer;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::services::{
    ai_service::AIService, interview_service::InterviewService, resume_service::ResumeService,
    session_store::SessionStore,
};
use reqwest::Client;

#[derive(Clone)]
pub struct AppState {
    pub store: SessionStore,
    pub ai_service: AIService,
    pub interview: Arc<InterviewService>,
    pub resume_service: ResumeService,
}

impl AppState {
    /// Wires the services around `store` and spawns the timer worker, so it
    /// must be called inside a tokio runtime.
    pub fn new(store: SessionStore, ai_service: AIService) -> Self {
        let (interview, timer_events) = InterviewService::new(store.clone(), ai_service.clone());
        let interview = Arc::new(interview);
        interview.spawn_timer_worker(timer_events);
        let resume_service = ResumeService::new(ai_service.clone());

        Self {
            store,
            ai_service,
            interview,
            resume_service,
        }
    }

    pub fn from_config(store: SessionStore, config: &Config) -> error::Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        let ai_service = AIService::new(
            config.openai_api_key.clone(),
            config.openai_model.clone(),
            http_client,
        );
        Ok(Self::new(store, ai_service))
    }
}
