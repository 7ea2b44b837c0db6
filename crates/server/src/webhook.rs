//! Webhook ingest for the voice provider's call lifecycle events.
//!
//! Delivery policy: every request is acknowledged with 200, including
//! malformed bodies and internal failures, so the provider never retries
//! a delivery against us. Failures are logged and reported in the
//! response body only.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use checkcall_agent::{AgentResponseRequest, ChatMessage};
use checkcall_db::repositories::{AgentConfigRepository, CallLogRepository};
use checkcall_voice::{TranscriptTurn, WebhookEvent};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::bootstrap::AppState;

const MISSING_CALL_RESPONSE: &str = "I'm sorry, I couldn't find the call information.";
const MISSING_CONFIG_RESPONSE: &str = "Configuration not found.";
const TECHNICAL_DIFFICULTY_RESPONSE: &str = "I apologize, but I'm experiencing technical \
     difficulties. A human dispatcher will call you back shortly.";

pub fn router(state: AppState) -> Router {
    Router::new().route("/api/webhook/retell", post(handle_webhook)).with_state(state)
}

pub async fn handle_webhook(
    State(state): State<AppState>,
    body: String,
) -> (StatusCode, Json<Value>) {
    let event = match WebhookEvent::parse(&body) {
        Ok(event) => event,
        Err(err) => {
            warn!(
                event_name = "webhook.unparseable",
                error = %err,
                "webhook body could not be parsed, acknowledging anyway"
            );
            return (StatusCode::OK, Json(json!({"status": "error", "error": err.to_string()})));
        }
    };

    let response = match event {
        WebhookEvent::CallStarted { call_id } => handle_call_started(&state, &call_id).await,
        WebhookEvent::CallEnded { call_id, transcript } => {
            handle_call_ended(&state, &call_id, &transcript).await
        }
        WebhookEvent::AgentResponseRequired { call_id, history, user_utterance } => {
            handle_agent_response(&state, &call_id, history, &user_utterance).await
        }
        WebhookEvent::Unknown { event_type } => {
            info!(
                event_name = "webhook.unknown_event",
                webhook_event = %event_type,
                "ignoring unrecognized webhook event"
            );
            json!({"status": "ok"})
        }
    };

    (StatusCode::OK, Json(response))
}

async fn handle_call_started(state: &AppState, call_id: &str) -> Value {
    let call_logs = CallLogRepository::new(state.db_pool.clone());

    match call_logs.mark_in_progress(call_id).await {
        Ok(0) => {
            warn!(
                event_name = "webhook.call_started.no_match",
                call_id = %call_id,
                "call_started for unknown call id"
            );
        }
        Ok(_) => {
            info!(event_name = "webhook.call_started", call_id = %call_id, "call in progress");
        }
        Err(err) => {
            warn!(
                event_name = "webhook.call_started.failed",
                call_id = %call_id,
                error = %err,
                "could not mark call in progress"
            );
            return json!({"status": "error", "error": "call update failed"});
        }
    }

    json!({"status": "ok"})
}

async fn handle_call_ended(state: &AppState, call_id: &str, transcript: &str) -> Value {
    let call_logs = CallLogRepository::new(state.db_pool.clone());

    let log = match call_logs.find_by_call_id(call_id).await {
        Ok(Some(log)) => log,
        Ok(None) => {
            warn!(
                event_name = "webhook.call_ended.no_match",
                call_id = %call_id,
                "call_ended for unknown call id"
            );
            return json!({"status": "ok"});
        }
        Err(err) => {
            warn!(
                event_name = "webhook.call_ended.load_failed",
                call_id = %call_id,
                error = %err,
                "could not load call log"
            );
            return json!({"status": "error", "error": "call lookup failed"});
        }
    };

    let processed =
        state.processor.process(transcript, &log.driver_name, &log.load_number).await;
    if let Some(reason) = processed.reason() {
        warn!(
            event_name = "webhook.call_ended.degraded_extraction",
            call_id = %call_id,
            reason = %reason,
            "transcript extraction degraded"
        );
    }

    let structured = processed.into_value();
    let outcome = structured.outcome();

    if let Err(err) = call_logs.finalize(call_id, transcript, &structured, outcome).await {
        warn!(
            event_name = "webhook.call_ended.persist_failed",
            call_id = %call_id,
            error = %err,
            "could not persist call results"
        );
        return json!({"status": "error", "error": "call update failed"});
    }

    info!(
        event_name = "webhook.call_ended.processed",
        call_id = %call_id,
        call_outcome = %outcome,
        "call transcript processed"
    );
    json!({"status": "ok"})
}

async fn handle_agent_response(
    state: &AppState,
    call_id: &str,
    history: Vec<TranscriptTurn>,
    user_utterance: &str,
) -> Value {
    let call_logs = CallLogRepository::new(state.db_pool.clone());
    let configs = AgentConfigRepository::new(state.db_pool.clone());

    let log = match call_logs.find_by_call_id(call_id).await {
        Ok(Some(log)) => log,
        Ok(None) => return json!({"response": MISSING_CALL_RESPONSE}),
        Err(err) => {
            warn!(
                event_name = "webhook.agent_response.load_failed",
                call_id = %call_id,
                error = %err,
                "could not load call log"
            );
            return json!({"response": TECHNICAL_DIFFICULTY_RESPONSE});
        }
    };

    let config = match configs.find_by_id(&log.agent_config_id).await {
        Ok(Some(config)) => config,
        Ok(None) => return json!({"response": MISSING_CONFIG_RESPONSE}),
        Err(err) => {
            warn!(
                event_name = "webhook.agent_response.config_load_failed",
                call_id = %call_id,
                error = %err,
                "could not load agent config"
            );
            return json!({"response": TECHNICAL_DIFFICULTY_RESPONSE});
        }
    };

    let chat_history: Vec<ChatMessage> = history
        .into_iter()
        .map(|turn| {
            if turn.is_driver() {
                ChatMessage::user(turn.content)
            } else {
                ChatMessage::assistant(turn.content)
            }
        })
        .collect();

    let generated = state
        .agent
        .generate_response(AgentResponseRequest {
            user_message: user_utterance,
            history: &chat_history,
            system_prompt: &config.system_prompt,
            conversation_logic: &config.conversation_logic,
            driver_name: &log.driver_name,
            load_number: &log.load_number,
        })
        .await;

    if let Some(reason) = generated.reason() {
        warn!(
            event_name = "webhook.agent_response.degraded",
            call_id = %call_id,
            reason = %reason,
            "agent response degraded to fallback text"
        );
    }

    json!({"response": generated.into_value()})
}
