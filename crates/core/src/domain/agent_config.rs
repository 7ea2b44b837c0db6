use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;

pub const NAME_MAX_LEN: usize = 255;
pub const PROMPT_MIN_LEN: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    pub system_prompt: String,
    pub conversation_logic: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unsaved config payload as accepted at the API boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentConfigDraft {
    pub name: String,
    pub system_prompt: String,
    pub conversation_logic: String,
}

impl AgentConfigDraft {
    pub fn validate(&self) -> Result<(), ApiError> {
        let name = self.name.trim();
        if name.is_empty() || name.len() > NAME_MAX_LEN {
            return Err(ApiError::Validation(format!(
                "name must be between 1 and {NAME_MAX_LEN} characters"
            )));
        }
        if self.system_prompt.trim().len() < PROMPT_MIN_LEN {
            return Err(ApiError::Validation(format!(
                "system_prompt must be at least {PROMPT_MIN_LEN} characters"
            )));
        }
        if self.conversation_logic.trim().len() < PROMPT_MIN_LEN {
            return Err(ApiError::Validation(format!(
                "conversation_logic must be at least {PROMPT_MIN_LEN} characters"
            )));
        }
        Ok(())
    }

    /// Seed config used when a call is triggered against an empty table.
    pub fn default_dispatch_agent() -> Self {
        Self {
            name: "Default Agent".to_string(),
            system_prompt: "You are a professional logistics dispatch agent.".to_string(),
            conversation_logic: "Ask about driver status and location.".to_string(),
        }
    }
}
