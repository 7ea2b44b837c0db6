use std::time::Duration;

use checkcall_core::config::VoiceConfig;
use checkcall_core::{DegradedReason, Sourced};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

/// Context bundle handed to the provider as call metadata so the live
/// agent can reference driver and load details.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CallContext {
    pub driver_name: String,
    pub load_number: String,
    pub system_prompt: String,
    pub conversation_logic: String,
}

enum Transport {
    Live { http: reqwest::Client, api_key: SecretString, agent_id: String, base_url: String },
    Test,
}

/// Originates outbound calls. `create_call` never fails outward: without
/// credentials, or when the live request fails for any reason, it hands
/// back a deterministic identifier derived from the phone number so the
/// trigger flow can still complete.
pub struct VoiceClient {
    transport: Transport,
}

impl VoiceClient {
    pub fn from_config(config: &VoiceConfig) -> Self {
        let transport = match (&config.api_key, &config.agent_id) {
            (Some(api_key), Some(agent_id)) => {
                match reqwest::Client::builder()
                    .timeout(Duration::from_secs(config.timeout_secs))
                    .build()
                {
                    Ok(http) => Transport::Live {
                        http,
                        api_key: api_key.clone(),
                        agent_id: agent_id.clone(),
                        base_url: config.base_url.trim_end_matches('/').to_string(),
                    },
                    Err(err) => {
                        warn!(
                            event_name = "voice.client.http_init_failed",
                            error = %err,
                            "voice http client could not be built, running in test mode"
                        );
                        Transport::Test
                    }
                }
            }
            _ => {
                warn!(
                    event_name = "voice.client.test_mode",
                    "voice api key or agent id not provided, running in test mode"
                );
                Transport::Test
            }
        };

        Self { transport }
    }

    pub fn is_live(&self) -> bool {
        matches!(self.transport, Transport::Live { .. })
    }

    pub async fn create_call(
        &self,
        phone_number: &str,
        context: &CallContext,
        webhook_url: &str,
    ) -> Sourced<String> {
        let Transport::Live { http, api_key, agent_id, base_url } = &self.transport else {
            return Sourced::degraded(
                test_call_id(phone_number),
                DegradedReason::MissingCredentials,
            );
        };

        let payload = json!({
            "agent_id": agent_id,
            "to_number": phone_number,
            "webhook_url": webhook_url,
            "metadata": context,
        });

        info!(
            event_name = "voice.call.create",
            phone_number = %phone_number,
            "creating outbound call"
        );

        match self.request_call(http, api_key, base_url, &payload).await {
            Ok(call_id) => Sourced::Live(call_id),
            Err(reason) => {
                warn!(
                    event_name = "voice.call.create_failed",
                    phone_number = %phone_number,
                    reason = %reason,
                    "call origination failed, falling back to test call id"
                );
                Sourced::degraded(test_call_id(phone_number), reason)
            }
        }
    }

    async fn request_call(
        &self,
        http: &reqwest::Client,
        api_key: &SecretString,
        base_url: &str,
        payload: &serde_json::Value,
    ) -> Result<String, DegradedReason> {
        let response = http
            .post(format!("{base_url}/create-phone-call"))
            .bearer_auth(api_key.expose_secret())
            .json(payload)
            .send()
            .await
            .map_err(|err| DegradedReason::RequestFailed(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DegradedReason::RequestFailed(format!("status {status}: {body}")));
        }

        let created: CreateCallResponse = response
            .json()
            .await
            .map_err(|err| DegradedReason::MalformedResponse(err.to_string()))?;

        created
            .call_id
            .filter(|call_id| !call_id.is_empty())
            .ok_or_else(|| DegradedReason::MalformedResponse("call_id missing".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct CreateCallResponse {
    call_id: Option<String>,
}

fn test_call_id(phone_number: &str) -> String {
    let digest = Sha256::digest(phone_number.as_bytes());
    let mut hex = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        hex.push_str(&format!("{byte:02x}"));
    }
    format!("test_call_{hex}")
}

#[cfg(test)]
mod tests {
    use checkcall_core::config::VoiceConfig;
    use checkcall_core::DegradedReason;

    use super::{test_call_id, CallContext, VoiceClient};

    fn config(api_key: Option<&str>, agent_id: Option<&str>) -> VoiceConfig {
        VoiceConfig {
            api_key: api_key.map(|key| key.to_string().into()),
            agent_id: agent_id.map(|id| id.to_string()),
            base_url: "https://api.retellai.com".to_string(),
            timeout_secs: 5,
        }
    }

    fn context() -> CallContext {
        CallContext {
            driver_name: "Alice".to_string(),
            load_number: "L100".to_string(),
            system_prompt: "You are a professional logistics dispatch agent.".to_string(),
            conversation_logic: "Ask about driver status and location.".to_string(),
        }
    }

    #[test]
    fn live_mode_requires_both_credentials() {
        assert!(VoiceClient::from_config(&config(Some("key"), Some("agent"))).is_live());
        assert!(!VoiceClient::from_config(&config(Some("key"), None)).is_live());
        assert!(!VoiceClient::from_config(&config(None, Some("agent"))).is_live());
        assert!(!VoiceClient::from_config(&config(None, None)).is_live());
    }

    #[tokio::test]
    async fn degraded_call_id_is_deterministic_per_phone_number() {
        let client = VoiceClient::from_config(&config(None, None));

        let first = client
            .create_call("+15551234567", &context(), "http://localhost:8000/api/webhook/retell")
            .await;
        let second = client
            .create_call("+15551234567", &context(), "http://localhost:8000/api/webhook/retell")
            .await;
        let other = client
            .create_call("+15559876543", &context(), "http://localhost:8000/api/webhook/retell")
            .await;

        assert_eq!(first.reason(), Some(&DegradedReason::MissingCredentials));
        assert_eq!(first.value(), second.value());
        assert_ne!(first.value(), other.value());
        assert!(first.value().starts_with("test_call_"));
    }

    #[test]
    fn test_call_id_is_stable() {
        assert_eq!(test_call_id("+15551234567"), test_call_id("+15551234567"));
        assert_eq!(test_call_id("+15551234567").len(), "test_call_".len() + 16);
    }
}
