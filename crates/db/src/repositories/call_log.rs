use std::str::FromStr;

use checkcall_core::{CallLog, CallOutcome, CallTrigger, StructuredCallData};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::agent_config::decode_timestamp;
use super::RepositoryError;
use crate::DbPool;

/// Access to the `call_log` table across the call lifecycle: one insert
/// at trigger time, then independent single-row updates as webhook events
/// arrive. Concurrent updates for the same call are last-write-wins.
#[derive(Clone)]
pub struct CallLogRepository {
    pool: DbPool,
}

impl CallLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        trigger: &CallTrigger,
        agent_config_id: &str,
    ) -> Result<CallLog, RepositoryError> {
        let now = Utc::now();
        let id = new_log_id();

        sqlx::query(
            "INSERT INTO call_log
                (id, driver_name, phone_number, load_number, agent_config_id,
                 call_outcome, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&trigger.driver_name)
        .bind(&trigger.phone_number)
        .bind(&trigger.load_number)
        .bind(agent_config_id)
        .bind(CallOutcome::Initiated.as_str())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(CallLog {
            id,
            driver_name: trigger.driver_name.clone(),
            phone_number: trigger.phone_number.clone(),
            load_number: trigger.load_number.clone(),
            agent_config_id: agent_config_id.to_string(),
            call_id: None,
            transcript: None,
            structured_data: None,
            call_outcome: CallOutcome::Initiated,
            created_at: now,
        })
    }

    pub async fn list(&self) -> Result<Vec<CallLog>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, driver_name, phone_number, load_number, agent_config_id,
                    call_id, transcript, structured_data, call_outcome, created_at
             FROM call_log ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode_call_log).collect()
    }

    pub async fn find_by_call_id(&self, call_id: &str) -> Result<Option<CallLog>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, driver_name, phone_number, load_number, agent_config_id,
                    call_id, transcript, structured_data, call_outcome, created_at
             FROM call_log WHERE call_id = ?",
        )
        .bind(call_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_call_log).transpose()
    }

    pub async fn assign_call_id(&self, log_id: &str, call_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE call_log SET call_id = ? WHERE id = ?")
            .bind(call_id)
            .bind(log_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Returns the number of rows touched so callers can log a miss
    /// instead of failing on an unknown call id.
    pub async fn mark_in_progress(&self, call_id: &str) -> Result<u64, RepositoryError> {
        let result = sqlx::query("UPDATE call_log SET call_outcome = ? WHERE call_id = ?")
            .bind(CallOutcome::InProgress.as_str())
            .bind(call_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn finalize(
        &self,
        call_id: &str,
        transcript: &str,
        structured_data: &StructuredCallData,
        outcome: CallOutcome,
    ) -> Result<u64, RepositoryError> {
        let structured_json = serde_json::to_string(structured_data)
            .map_err(|err| RepositoryError::Decode(format!("structured data encode: {err}")))?;

        let result = sqlx::query(
            "UPDATE call_log
             SET transcript = ?, structured_data = ?, call_outcome = ?
             WHERE call_id = ?",
        )
        .bind(transcript)
        .bind(structured_json)
        .bind(outcome.as_str())
        .bind(call_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

fn new_log_id() -> String {
    format!("CL-{}", &Uuid::new_v4().simple().to_string()[..12])
}

fn decode_call_log(row: SqliteRow) -> Result<CallLog, RepositoryError> {
    let outcome_raw: String = row.try_get("call_outcome")?;
    let call_outcome = CallOutcome::from_str(&outcome_raw).map_err(RepositoryError::Decode)?;

    let structured_raw: Option<String> = row.try_get("structured_data")?;
    let structured_data = structured_raw
        .map(|raw| {
            serde_json::from_str::<StructuredCallData>(&raw)
                .map_err(|err| RepositoryError::Decode(format!("structured data decode: {err}")))
        })
        .transpose()?;

    Ok(CallLog {
        id: row.try_get("id")?,
        driver_name: row.try_get("driver_name")?,
        phone_number: row.try_get("phone_number")?,
        load_number: row.try_get("load_number")?,
        agent_config_id: row.try_get("agent_config_id")?,
        call_id: row.try_get("call_id")?,
        transcript: row.try_get("transcript")?,
        structured_data,
        call_outcome,
        created_at: decode_timestamp(row.try_get("created_at")?)?,
    })
}
