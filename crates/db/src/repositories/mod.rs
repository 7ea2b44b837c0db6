use thiserror::Error;

pub mod agent_config;
pub mod call_log;

pub use agent_config::AgentConfigRepository;
pub use call_log::CallLogRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}
