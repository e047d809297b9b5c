use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{PersistedState, SessionStorage};
use crate::error::Result;

/// Keeps the serialized state in memory. State does not survive the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    saved: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the storage as if a previous process had saved `state`.
    pub fn with_state(state: &PersistedState) -> Result<Self> {
        Ok(Self {
            saved: Mutex::new(Some(serde_json::to_string(state)?)),
        })
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn load(&self) -> Result<Option<PersistedState>> {
        match self.saved.lock().await.as_deref() {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, state: &PersistedState) -> Result<()> {
        *self.saved.lock().await = Some(serde_json::to_string(state)?);
        Ok(())
    }
}
