//! Voice-provider integration: outbound call origination against the
//! Retell API and the typed model of its webhook event stream.

pub mod client;
pub mod events;

pub use client::{CallContext, VoiceClient};
pub use events::{TranscriptTurn, WebhookEvent, WebhookParseError};
