use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use super::{PersistedState, SessionStorage, STORAGE_NAME};
use crate::error::Result;

/// Stores the session state as one JSONB row in `session_storage`.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| crate::error::Error::Internal(format!("Migration failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl SessionStorage for PgStorage {
    async fn load(&self) -> Result<Option<PersistedState>> {
        let row: Option<(Json<PersistedState>,)> =
            sqlx::query_as(r#"SELECT state FROM session_storage WHERE name = $1"#)
                .bind(STORAGE_NAME)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(Json(state),)| state))
    }

    async fn save(&self, state: &PersistedState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO session_storage (name, state, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (name) DO UPDATE SET state = EXCLUDED.state, updated_at = NOW()
            "#,
        )
        .bind(STORAGE_NAME)
        .bind(Json(state))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
