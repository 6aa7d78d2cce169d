mod app;
mod chat_request;
mod chat_response;
mod handlers;

use anyhow::{Context, Result};
use app::{create_app, AppState};
use askpdf_rag::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment variables and logging
    dotenv::dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    log::info!(
        "Using LLM API at {} (session capacity: {})",
        config.llm.api_base,
        config
            .max_sessions
            .map_or_else(|| "unbounded".to_string(), |max| max.to_string())
    );

    let state = AppState::from_config(&config);
    let app = create_app(state, &config.frontend_url);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    log::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
