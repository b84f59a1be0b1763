use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use moodflix_api::{
    api::{create_router, AppState},
    config::Config,
    models::{default_questions, load_questions},
    services::providers::GeminiClient,
};

const SESSION_SWEEP_SECS: u64 = 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("moodflix_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let questions = match &config.questions_path {
        Some(path) => load_questions(path)
            .with_context(|| format!("Failed to load question bank from {}", path))?,
        None => default_questions(),
    };

    let model = GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_api_url.clone(),
        config.gemini_model.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?;
    tracing::info!(model = %config.gemini_model, questions = questions.len(), "Model client ready");

    let state = AppState::new(Arc::new(model), questions)?
        .with_session_ttl(Duration::from_secs(config.session_ttl_secs))
        .with_viewing_tips_capacity(config.viewing_tips_cache_size);
    let sweep_every = config.session_ttl_secs.clamp(1, SESSION_SWEEP_SECS);
    state.spawn_session_reaper(Duration::from_secs(sweep_every));
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(address = %address, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
