use std::sync::Arc;

use checkcall_core::{DegradedReason, Sourced};
use tracing::warn;

use crate::llm::{ChatMessage, ChatRequest, LlmClient};

/// Turns of history kept when building the completion request.
const HISTORY_WINDOW: usize = 10;
const RESPONSE_MAX_TOKENS: u32 = 150;
const RESPONSE_TEMPERATURE: f32 = 0.7;

const EMERGENCY_KEYWORDS: &str =
    "accident, breakdown, blowout, medical, emergency, help, crash, stuck, problem, issue";

/// Everything a single `agent_response_required` turn needs.
pub struct AgentResponseRequest<'a> {
    pub user_message: &'a str,
    pub history: &'a [ChatMessage],
    pub system_prompt: &'a str,
    pub conversation_logic: &'a str,
    pub driver_name: &'a str,
    pub load_number: &'a str,
}

/// Generates the agent's next utterance for a live call.
pub struct DispatchAgent {
    llm: Option<Arc<dyn LlmClient>>,
}

impl DispatchAgent {
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { llm }
    }

    pub fn is_live(&self) -> bool {
        self.llm.is_some()
    }

    /// Never fails: with no client it answers with a canned greeting, and
    /// a failed provider request degrades to a canned status question.
    pub async fn generate_response(&self, request: AgentResponseRequest<'_>) -> Sourced<String> {
        let Some(llm) = &self.llm else {
            return Sourced::degraded(
                greeting_fallback(request.driver_name, request.load_number),
                DegradedReason::MissingCredentials,
            );
        };

        let mut messages =
            Vec::with_capacity(request.history.len().min(HISTORY_WINDOW) + 2);
        messages.push(ChatMessage::system(system_block(&request)));

        let window_start = request.history.len().saturating_sub(HISTORY_WINDOW);
        messages.extend_from_slice(&request.history[window_start..]);
        messages.push(ChatMessage::user(request.user_message));

        let chat = ChatRequest {
            messages,
            max_tokens: RESPONSE_MAX_TOKENS,
            temperature: RESPONSE_TEMPERATURE,
        };

        match llm.chat(chat).await {
            Ok(text) => Sourced::Live(text),
            Err(err) => {
                warn!(
                    event_name = "agent.response.fallback",
                    driver_name = %request.driver_name,
                    error = %err,
                    "llm request failed, using status-update fallback"
                );
                Sourced::degraded(
                    status_fallback(request.driver_name, request.load_number),
                    DegradedReason::RequestFailed(err.to_string()),
                )
            }
        }
    }
}

fn system_block(request: &AgentResponseRequest<'_>) -> String {
    format!(
        "You are a professional logistics dispatch agent.\n\n\
         CONTEXT:\n\
         - Driver Name: {driver_name}\n\
         - Load Number: {load_number}\n\n\
         SYSTEM PROMPT:\n{system_prompt}\n\n\
         CONVERSATION LOGIC:\n{conversation_logic}\n\n\
         IMPORTANT GUIDELINES:\n\
         1. Sound natural and professional\n\
         2. If the driver mentions an emergency (accident, breakdown, medical issue, etc.), immediately shift to emergency protocol\n\
         3. For emergencies, gather: location, type of emergency, and assure them a human dispatcher will call back\n\
         4. For routine check-ins, ask about status, location, and ETA\n\
         5. Handle uncooperative or unclear responses professionally\n\
         6. Keep responses concise and focused\n\
         7. Use natural speech patterns and filler words occasionally to sound human\n\n\
         Emergency keywords to watch for: {keywords}",
        driver_name = request.driver_name,
        load_number = request.load_number,
        system_prompt = request.system_prompt,
        conversation_logic = request.conversation_logic,
        keywords = EMERGENCY_KEYWORDS,
    )
}

fn greeting_fallback(driver_name: &str, load_number: &str) -> String {
    format!(
        "Hello {driver_name}, this is dispatch calling about load {load_number}. \
         How are you doing today?"
    )
}

fn status_fallback(driver_name: &str, load_number: &str) -> String {
    format!(
        "Hello {driver_name}, this is dispatch calling about load {load_number}. \
         Can you give me a status update?"
    )
}
