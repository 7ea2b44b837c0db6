mod api;
mod bootstrap;
mod health;
mod webhook;

use anyhow::Result;
use axum::http::HeaderValue;
use axum::Router;
use checkcall_core::config::{AppConfig, LoadOptions};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::bootstrap::AppState;

fn init_logging(config: &AppConfig) {
    use checkcall_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

fn app_router(state: AppState, config: &AppConfig) -> Router {
    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::router(state.clone()))
        .merge(webhook::router(state.clone()))
        .merge(health::router(state))
        .layer(cors)
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let router = app_router(app.state.clone(), &app.config);

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        webhook_url = %app.state.webhook_url,
        "checkcall-server listening"
    );

    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!(event_name = "system.server.stopping", "checkcall-server stopping");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
