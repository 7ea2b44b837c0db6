//! REST surface for agent configurations and call logs.
//!
//! JSON Endpoints:
//! - `GET  /api/configs`          — list agent configurations
//! - `POST /api/configs`          — create a configuration
//! - `PUT  /api/configs/{id}`     — update a configuration
//! - `POST /api/calls/trigger`    — originate an outbound check call
//! - `GET  /api/calls`            — list call logs, newest first
//! - `GET  /api/calls/{call_id}`  — fetch one call log by provider call id

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use checkcall_core::{AgentConfig, AgentConfigDraft, ApiError, CallLog, CallTrigger};
use checkcall_db::repositories::{AgentConfigRepository, CallLogRepository, RepositoryError};
use checkcall_voice::CallContext;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::bootstrap::AppState;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ConfigsResponse {
    pub configs: Vec<AgentConfig>,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub config: AgentConfig,
}

#[derive(Debug, Serialize)]
pub struct CallsResponse {
    pub calls: Vec<CallLog>,
}

#[derive(Debug, Serialize)]
pub struct CallResponse {
    pub call: CallLog,
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub call_id: String,
    pub log_id: String,
    pub status: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/configs", get(list_configs).post(create_config))
        .route("/api/configs/{id}", put(update_config))
        .route("/api/calls/trigger", post(trigger_call))
        .route("/api/calls", get(list_calls))
        .route("/api/calls/{call_id}", get(get_call))
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({"message": "Checkcall API", "status": "running"}))
}

pub async fn list_configs(
    State(state): State<AppState>,
) -> Result<Json<ConfigsResponse>, (StatusCode, Json<ApiErrorBody>)> {
    let configs =
        AgentConfigRepository::new(state.db_pool.clone()).list().await.map_err(db_error)?;
    Ok(Json(ConfigsResponse { configs }))
}

pub async fn create_config(
    State(state): State<AppState>,
    Json(draft): Json<AgentConfigDraft>,
) -> Result<Json<ConfigResponse>, (StatusCode, Json<ApiErrorBody>)> {
    draft.validate().map_err(error_response)?;

    let config =
        AgentConfigRepository::new(state.db_pool.clone()).insert(&draft).await.map_err(db_error)?;

    info!(event_name = "api.config.created", config_id = %config.id, "agent config created");
    Ok(Json(ConfigResponse { config }))
}

pub async fn update_config(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(draft): Json<AgentConfigDraft>,
) -> Result<Json<ConfigResponse>, (StatusCode, Json<ApiErrorBody>)> {
    draft.validate().map_err(error_response)?;

    let updated = AgentConfigRepository::new(state.db_pool.clone())
        .update(&id, &draft)
        .await
        .map_err(db_error)?;

    let config = updated.ok_or_else(|| {
        error_response(ApiError::NotFound("configuration not found".to_string()))
    })?;

    info!(event_name = "api.config.updated", config_id = %config.id, "agent config updated");
    Ok(Json(ConfigResponse { config }))
}

/// Creates the call log row, then originates the call. Provider failures
/// do not fail the request: once the log row exists the caller always
/// gets an identifier, possibly the degraded fallback.
pub async fn trigger_call(
    State(state): State<AppState>,
    Json(trigger): Json<CallTrigger>,
) -> Result<Json<TriggerResponse>, (StatusCode, Json<ApiErrorBody>)> {
    trigger.validate().map_err(error_response)?;

    let voice = state.voice.clone().ok_or_else(|| {
        error_response(ApiError::ServiceUnavailable("voice service not available".to_string()))
    })?;

    info!(
        event_name = "api.call.trigger",
        driver_name = %trigger.driver_name,
        phone_number = %trigger.phone_number,
        load_number = %trigger.load_number,
        "triggering outbound call"
    );

    let configs = AgentConfigRepository::new(state.db_pool.clone());
    let call_logs = CallLogRepository::new(state.db_pool.clone());

    let config = configs.first_or_default().await.map_err(db_error)?;
    let log = call_logs.insert(&trigger, &config.id).await.map_err(db_error)?;

    let context = CallContext {
        driver_name: trigger.driver_name.clone(),
        load_number: trigger.load_number.clone(),
        system_prompt: config.system_prompt.clone(),
        conversation_logic: config.conversation_logic.clone(),
    };

    let sourced = voice.create_call(&trigger.phone_number, &context, &state.webhook_url).await;
    if let Some(reason) = sourced.reason() {
        warn!(
            event_name = "api.call.fallback_id",
            log_id = %log.id,
            reason = %reason,
            "provider call origination degraded, storing fallback call id"
        );
    }
    let call_id = sourced.into_value();

    call_logs.assign_call_id(&log.id, &call_id).await.map_err(db_error)?;
    info!(
        event_name = "api.call.triggered",
        log_id = %log.id,
        call_id = %call_id,
        "call log updated with call id"
    );

    Ok(Json(TriggerResponse { call_id, log_id: log.id, status: "initiated".to_string() }))
}

pub async fn list_calls(
    State(state): State<AppState>,
) -> Result<Json<CallsResponse>, (StatusCode, Json<ApiErrorBody>)> {
    let calls = CallLogRepository::new(state.db_pool.clone()).list().await.map_err(db_error)?;
    Ok(Json(CallsResponse { calls }))
}

pub async fn get_call(
    Path(call_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CallResponse>, (StatusCode, Json<ApiErrorBody>)> {
    let call = CallLogRepository::new(state.db_pool.clone())
        .find_by_call_id(&call_id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| error_response(ApiError::NotFound("call not found".to_string())))?;

    Ok(Json(CallResponse { call }))
}

pub(crate) fn error_response(error: ApiError) -> (StatusCode, Json<ApiErrorBody>) {
    let status = match &error {
        ApiError::Validation(_) => StatusCode::BAD_REQUEST,
        ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiErrorBody { error: error.public_message() }))
}

pub(crate) fn db_error(error: RepositoryError) -> (StatusCode, Json<ApiErrorBody>) {
    error!(event_name = "api.database_error", error = %error, "database operation failed");
    error_response(ApiError::Internal(error.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::Json;
    use checkcall_agent::{DispatchAgent, TranscriptProcessor};
    use checkcall_core::config::VoiceConfig;
    use checkcall_core::{AgentConfigDraft, CallOutcome, CallTrigger};
    use checkcall_db::repositories::AgentConfigRepository;
    use checkcall_db::{connect_with_settings, migrations};
    use checkcall_voice::VoiceClient;

    use super::{create_config, get_call, list_calls, list_configs, trigger_call, update_config};
    use crate::bootstrap::{AppState, CredentialPresence};

    async fn test_state() -> AppState {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

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

    fn draft(name: &str) -> AgentConfigDraft {
        AgentConfigDraft {
            name: name.to_string(),
            system_prompt: "You are a professional logistics dispatch agent.".to_string(),
            conversation_logic: "Ask about driver status and location.".to_string(),
        }
    }

    fn trigger() -> CallTrigger {
        CallTrigger {
            driver_name: "Alice".to_string(),
            phone_number: "+15551234567".to_string(),
            load_number: "L100".to_string(),
        }
    }

    #[tokio::test]
    async fn created_config_echoes_fields_and_is_listed() {
        let state = test_state().await;

        let created = create_config(State(state.clone()), Json(draft("Day Shift")))
            .await
            .expect("create should succeed");
        assert_eq!(created.0.config.name, "Day Shift");
        assert_eq!(
            created.0.config.system_prompt,
            "You are a professional logistics dispatch agent."
        );

        let listed = list_configs(State(state)).await.expect("list should succeed");
        assert_eq!(listed.0.configs.len(), 1);
        assert_eq!(listed.0.configs[0].id, created.0.config.id);
    }

    #[tokio::test]
    async fn short_system_prompt_is_a_bad_request() {
        let state = test_state().await;

        let mut invalid = draft("Day Shift");
        invalid.system_prompt = "short".to_string();

        let result = create_config(State(state), Json(invalid)).await;
        let (status, body) = result.expect_err("short prompt should be rejected");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.0.error.contains("system_prompt"));
    }

    #[tokio::test]
    async fn updating_missing_config_is_not_found() {
        let state = test_state().await;

        let result =
            update_config(Path("AC-missing".to_string()), State(state), Json(draft("Renamed")))
                .await;
        let (status, _) = result.expect_err("missing id should be rejected");
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_is_visible_on_subsequent_read() {
        let state = test_state().await;
        let created = create_config(State(state.clone()), Json(draft("Original")))
            .await
            .expect("create should succeed");

        let updated = update_config(
            Path(created.0.config.id.clone()),
            State(state.clone()),
            Json(draft("Renamed")),
        )
        .await
        .expect("update should succeed");
        assert_eq!(updated.0.config.name, "Renamed");

        let listed = list_configs(State(state)).await.expect("list should succeed");
        assert_eq!(listed.0.configs[0].name, "Renamed");
    }

    #[tokio::test]
    async fn trigger_with_empty_config_table_seeds_exactly_one_default() {
        let state = test_state().await;

        let response = trigger_call(State(state.clone()), Json(trigger()))
            .await
            .expect("trigger should succeed in degraded mode");
        assert_eq!(response.0.status, "initiated");
        assert!(response.0.call_id.starts_with("test_call_"));
        assert!(response.0.log_id.starts_with("CL-"));

        let configs = AgentConfigRepository::new(state.db_pool.clone());
        let all = configs.list().await.expect("list configs");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Default Agent");

        let call = get_call(Path(response.0.call_id.clone()), State(state))
            .await
            .expect("call should be retrievable");
        assert_eq!(call.0.call.agent_config_id, all[0].id);
        assert_eq!(call.0.call.call_outcome, CallOutcome::Initiated);
    }

    #[tokio::test]
    async fn degraded_call_id_is_deterministic_for_a_phone_number() {
        let state = test_state().await;

        let first = trigger_call(State(state.clone()), Json(trigger()))
            .await
            .expect("first trigger should succeed");
        let second = trigger_call(State(state), Json(trigger()))
            .await
            .expect("second trigger should succeed");

        assert_eq!(first.0.call_id, second.0.call_id);
        assert_ne!(first.0.log_id, second.0.log_id);
    }

    #[tokio::test]
    async fn trigger_without_voice_client_is_service_unavailable() {
        let mut state = test_state().await;
        state.voice = None;

        let result = trigger_call(State(state), Json(trigger())).await;
        let (status, body) = result.expect_err("missing voice client should be rejected");
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.0.error.contains("voice service"));
    }

    #[tokio::test]
    async fn trigger_rejects_short_phone_number() {
        let state = test_state().await;

        let mut invalid = trigger();
        invalid.phone_number = "555".to_string();

        let result = trigger_call(State(state), Json(invalid)).await;
        let (status, _) = result.expect_err("short phone number should be rejected");
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn calls_list_newest_first_and_missing_call_is_not_found() {
        let state = test_state().await;

        trigger_call(State(state.clone()), Json(trigger()))
            .await
            .expect("trigger should succeed");

        let listed = list_calls(State(state.clone())).await.expect("list calls");
        assert_eq!(listed.0.calls.len(), 1);

        let missing = get_call(Path("call-unknown".to_string()), State(state)).await;
        let (status, _) = missing.expect_err("unknown call id should be rejected");
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
