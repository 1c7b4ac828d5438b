use std::sync::Arc;

use anyhow::Context;
use db::DBService;
use server::{AppState, router};
use services::services::{
    claude_api::ClaudeApiClient, config::AppConfig, loot_factory::ClaudeLootFactory,
    quest_narrator::ClaudeQuestNarrator,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let _sentry = utils::sentry::init_once(config.sentry_dsn.as_deref());
    utils::sentry::init_tracing();

    let claude = match config.anthropic_api_key.clone() {
        Some(key) => Some(ClaudeApiClient::new(key, config.claude_model.clone())?),
        None => {
            warn!("ANTHROPIC_API_KEY not set; loot and quest generation will fail");
            None
        }
    };

    let db = DBService::new(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;

    let state = AppState::new(
        db,
        &config,
        Arc::new(ClaudeLootFactory::new(claude.clone())),
        Arc::new(ClaudeQuestNarrator::new(claude)),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(
        addr = %config.bind_addr,
        guests = config.allow_guest_chests,
        "Server listening"
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}
