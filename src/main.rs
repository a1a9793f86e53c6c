mod config;
mod llm;
mod platform;
mod relay;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::llm::LlmClient;
use crate::relay::Relay;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relaybot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // An explicit path must exist; the default config.toml is optional
    let explicit = std::env::args().nth(1).map(PathBuf::from);
    let required = explicit.is_some();
    let config_path = explicit.unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path, required)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Provider: {}", config.llm.provider);
    info!("  Model: {}", config.llm.model);
    info!("  Endpoint: {}", config.llm.effective_base_url());
    info!("  Allowed channel: {}", config.discord.allowed_channel_id);
    if config.llm.api_key.is_empty() {
        warn!("No completion API key set (OPENROUTER_KEY)");
    }

    let relay = Arc::new(Relay::new(LlmClient::new(config.llm.clone())));

    info!("Bot is starting...");
    platform::discord::run(relay, &config.discord).await?;

    Ok(())
}
