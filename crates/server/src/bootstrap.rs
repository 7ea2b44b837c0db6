use std::sync::Arc;

use checkcall_agent::{DispatchAgent, LlmClient, OpenAiChatClient, TranscriptProcessor};
use checkcall_core::config::{AppConfig, ConfigError, LoadOptions};
use checkcall_db::{connect, migrations, DbPool};
use checkcall_voice::VoiceClient;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Shared handles passed into every request handler. Built once at
/// startup and read-only afterwards; there is no other cross-request
/// state.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub voice: Option<Arc<VoiceClient>>,
    pub agent: Arc<DispatchAgent>,
    pub processor: Arc<TranscriptProcessor>,
    pub webhook_url: String,
    pub credentials: CredentialPresence,
}

/// Which credentials were supplied at startup. Booleans only; the health
/// endpoint reports these without revealing values.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct CredentialPresence {
    pub voice_api_key: bool,
    pub voice_agent_id: bool,
    pub llm_api_key: bool,
}

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Missing provider credentials never fail bootstrap; the corresponding
/// clients come up in their degraded modes instead.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let llm: Option<Arc<dyn LlmClient>> = OpenAiChatClient::from_config(&config.llm)
        .map(|client| Arc::new(client) as Arc<dyn LlmClient>);
    let voice = Arc::new(VoiceClient::from_config(&config.voice));

    let credentials = CredentialPresence {
        voice_api_key: config.voice.api_key.is_some(),
        voice_agent_id: config.voice.agent_id.is_some(),
        llm_api_key: config.llm.api_key.is_some(),
    };

    let webhook_url = format!(
        "{}/api/webhook/retell",
        config.server.public_base_url.trim_end_matches('/')
    );

    info!(
        event_name = "system.bootstrap.services_initialized",
        voice_mode = if voice.is_live() { "live" } else { "test" },
        llm_mode = if llm.is_some() { "live" } else { "test" },
        webhook_url = %webhook_url,
        "service clients initialized"
    );

    let state = AppState {
        db_pool,
        voice: Some(voice),
        agent: Arc::new(DispatchAgent::new(llm.clone())),
        processor: Arc::new(TranscriptProcessor::new(llm)),
        webhook_url,
        credentials,
    };

    Ok(Application { config, state })
}

#[cfg(test)]
mod tests {
    use checkcall_core::config::{ConfigOverrides, LoadOptions};

    use super::bootstrap;

    fn overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_succeeds_without_any_provider_credentials() {
        let app = bootstrap(overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with no credentials");

        let voice = app.state.voice.as_ref().expect("voice client should be constructed");
        assert!(!voice.is_live(), "voice client should run in test mode");
        assert!(!app.state.agent.is_live(), "agent should run without an llm client");
        assert!(!app.state.processor.is_live(), "processor should run without an llm client");
        assert!(!app.state.credentials.voice_api_key);
        assert!(!app.state.credentials.llm_api_key);

        app.state.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_builds_webhook_url() {
        let app = bootstrap(overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('agent_config', 'call_log')",
        )
        .fetch_one(&app.state.db_pool)
        .await
        .expect("expected baseline tables to be available after bootstrap");
        assert_eq!(table_count, 2, "bootstrap should expose both baseline tables");

        assert_eq!(app.state.webhook_url, "http://localhost:8000/api/webhook/retell");

        app.state.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_rejects_invalid_database_url() {
        let result = bootstrap(overrides("postgres://not-sqlite")).await;
        assert!(result.is_err(), "non-sqlite database url should fail config validation");
    }
}
