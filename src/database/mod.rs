//! Persistence boundary for the interview session state.

pub mod file_storage;
pub mod memory_storage;
pub mod pg_storage;
pub mod pool;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::candidate::Candidate;

pub use file_storage::FileStorage;
pub use memory_storage::MemoryStorage;
pub use pg_storage::PgStorage;

/// Fixed key the session state is stored under.
pub const STORAGE_NAME: &str = "interview-storage";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub current_candidate: Option<Candidate>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// `None` when nothing has been saved yet.
    async fn load(&self) -> Result<Option<PersistedState>>;

    async fn save(&self, state: &PersistedState) -> Result<()>;
}
