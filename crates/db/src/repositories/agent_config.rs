use checkcall_core::{AgentConfig, AgentConfigDraft};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::RepositoryError;
use crate::DbPool;

/// Keyed access to the `agent_config` table.
#[derive(Clone)]
pub struct AgentConfigRepository {
    pool: DbPool,
}

impl AgentConfigRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, draft: &AgentConfigDraft) -> Result<AgentConfig, RepositoryError> {
        let now = Utc::now();
        let id = new_config_id();

        sqlx::query(
            "INSERT INTO agent_config
                (id, name, system_prompt, conversation_logic, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&draft.name)
        .bind(&draft.system_prompt)
        .bind(&draft.conversation_logic)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(AgentConfig {
            id,
            name: draft.name.clone(),
            system_prompt: draft.system_prompt.clone(),
            conversation_logic: draft.conversation_logic.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns `None` when no row with the given id exists.
    pub async fn update(
        &self,
        id: &str,
        draft: &AgentConfigDraft,
    ) -> Result<Option<AgentConfig>, RepositoryError> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE agent_config
             SET name = ?, system_prompt = ?, conversation_logic = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&draft.name)
        .bind(&draft.system_prompt)
        .bind(&draft.conversation_logic)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_by_id(id).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<AgentConfig>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, system_prompt, conversation_logic, created_at, updated_at
             FROM agent_config WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_config).transpose()
    }

    pub async fn list(&self) -> Result<Vec<AgentConfig>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, system_prompt, conversation_logic, created_at, updated_at
             FROM agent_config ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode_config).collect()
    }

    pub async fn first(&self) -> Result<Option<AgentConfig>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, system_prompt, conversation_logic, created_at, updated_at
             FROM agent_config ORDER BY created_at ASC, id ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_config).transpose()
    }

    /// First stored config, seeding the default dispatch agent when the
    /// table is empty.
    pub async fn first_or_default(&self) -> Result<AgentConfig, RepositoryError> {
        if let Some(config) = self.first().await? {
            return Ok(config);
        }

        self.insert(&AgentConfigDraft::default_dispatch_agent()).await
    }
}

fn new_config_id() -> String {
    format!("AC-{}", &Uuid::new_v4().simple().to_string()[..12])
}

fn decode_config(row: SqliteRow) -> Result<AgentConfig, RepositoryError> {
    Ok(AgentConfig {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        system_prompt: row.try_get("system_prompt")?,
        conversation_logic: row.try_get("conversation_logic")?,
        created_at: decode_timestamp(row.try_get("created_at")?)?,
        updated_at: decode_timestamp(row.try_get("updated_at")?)?,
    })
}

pub(crate) fn decode_timestamp(raw: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| RepositoryError::Decode(format!("bad timestamp `{raw}`: {err}")))
}
