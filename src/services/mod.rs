pub mod ai_service;
pub mod interview_service;
pub mod resume_service;
pub mod session_store;
pub mod submission_guard;
