//! Conversation side of the dispatch service.
//!
//! Two consumers sit on top of one LLM client:
//! - `dispatch` answers live `agent_response_required` webhook turns, and
//! - `transcript` turns a finished call's transcript into a structured
//!   outcome record.
//!
//! Both always produce a usable value: without credentials, or when the
//! provider request fails, they substitute fixed fallbacks and tag the
//! result as degraded (`checkcall_core::Sourced`). The LLM never decides
//! call outcomes on its own terms; everything it returns is validated
//! against the closed vocabulary in `checkcall_core::domain::call`.

pub mod dispatch;
pub mod llm;
pub mod transcript;

pub use dispatch::{AgentResponseRequest, DispatchAgent};
pub use llm::{ChatMessage, ChatRequest, ChatRole, LlmClient, LlmError, OpenAiChatClient};
pub use transcript::TranscriptProcessor;
