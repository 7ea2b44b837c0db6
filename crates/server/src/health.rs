use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use checkcall_db::DbPool;
use serde::Serialize;
use tracing::info;

use crate::bootstrap::{AppState, CredentialPresence};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ServiceChecks {
    pub database: HealthCheck,
    pub voice: HealthCheck,
    pub llm: HealthCheck,
    pub transcript_processor: HealthCheck,
}

/// Readiness of each collaborator plus which credentials were supplied.
/// Degraded providers do not fail the probe; only an unreachable
/// database does.
#[derive(Clone, Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub services: ServiceChecks,
    pub credentials: CredentialPresence,
    pub checked_at: String,
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let ready = database.status == "ready";

    let voice = match &state.voice {
        None => HealthCheck {
            status: "unavailable",
            detail: "voice client was not initialized".to_string(),
        },
        Some(voice) if voice.is_live() => {
            HealthCheck { status: "ready", detail: "voice provider configured".to_string() }
        }
        Some(_) => HealthCheck {
            status: "degraded",
            detail: "running in test mode (credentials missing)".to_string(),
        },
    };

    let llm = if state.agent.is_live() {
        HealthCheck { status: "ready", detail: "llm provider configured".to_string() }
    } else {
        HealthCheck {
            status: "degraded",
            detail: "running in test mode (credentials missing)".to_string(),
        }
    };

    let transcript_processor = if state.processor.is_live() {
        HealthCheck { status: "ready", detail: "transcript extraction enabled".to_string() }
    } else {
        HealthCheck {
            status: "degraded",
            detail: "returning canned test records".to_string(),
        }
    };

    info!(
        event_name = "health.checked",
        database = %database.status,
        voice = %voice.status,
        llm = %llm.status,
        "health probe served"
    );

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        services: ServiceChecks { database, voice, llm, transcript_processor },
        credentials: state.credentials,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::Json;
    use checkcall_agent::{DispatchAgent, TranscriptProcessor};
    use checkcall_core::config::VoiceConfig;
    use checkcall_db::connect_with_settings;
    use checkcall_voice::VoiceClient;

    use super::health;
    use crate::bootstrap::{AppState, CredentialPresence};

    async fn state() -> AppState {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 5)
            .await
            .expect("pool should connect");

        let voice = VoiceClient::from_config(&VoiceConfig {
            api_key: None,
            agent_id: None,
            base_url: "https://api.retellai.com".to_string(),
            timeout_secs: 5,
        });

        AppState {
            db_pool: pool,
            voice: Some(Arc::new(voice)),
            agent: Arc::new(DispatchAgent::new(None)),
            processor: Arc::new(TranscriptProcessor::new(None)),
            webhook_url: "http://localhost:8000/api/webhook/retell".to_string(),
            credentials: CredentialPresence {
                voice_api_key: false,
                voice_agent_id: false,
                llm_api_key: false,
            },
        }
    }

    #[tokio::test]
    async fn reports_ready_with_degraded_providers() {
        let fixture = state().await;
        let pool = fixture.db_pool.clone();

        let (status, Json(payload)) = health(State(fixture)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.services.database.status, "ready");
        assert_eq!(payload.services.voice.status, "degraded");
        assert_eq!(payload.services.llm.status, "degraded");
        assert_eq!(payload.services.transcript_processor.status, "degraded");
        assert!(!payload.credentials.voice_api_key);
        assert!(!payload.credentials.llm_api_key);

        pool.close().await;
    }

    #[tokio::test]
    async fn reports_service_unavailable_when_database_is_down() {
        let fixture = state().await;
        fixture.db_pool.close().await;

        let (status, Json(payload)) = health(State(fixture)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.services.database.status, "degraded");
    }
}
