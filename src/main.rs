use anyhow::Result;
use serenity::prelude::*;
use std::sync::Arc;
use tracing::{error, info};

mod bot;
mod commands;
mod config;
mod engine;
mod error;
mod handler;
mod mirror;
mod render;
mod scheduler;
mod store;
mod sweeper;
mod utils;

use bot::Bot;
use config::Config;
use handler::Handler;
use store::RosterStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "planday_bot=info,serenity=warn".to_string()),
        )
        .init();

    info!("Starting Planday bot...");

    let config = Arc::new(Config::from_env()?);
    let store = RosterStore::load(config.data_file_path.clone()).await?;
    let bot = Bot::new(store);

    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MEMBERS | GatewayIntents::GUILD_MESSAGES;

    let handler = Handler::new(bot.data.clone(), config.clone());

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Discord client: {}", e))?;

    info!("Bot initialized successfully, connecting to Discord...");

    if let Err(why) = client.start().await {
        error!("Discord client error: {}", why);
        return Err(anyhow::anyhow!("Discord client failed: {}", why));
    }

    Ok(())
}
