use chrono::Utc;
use serenity::builder::{CreateCommand, CreateCommandOption, CreateMessage, EditMessage};
use serenity::model::application::{CommandInteraction, CommandOptionType};
use serenity::model::id::MessageId;
use serenity::prelude::*;
use std::sync::Arc;
use tracing::{info, warn};

use crate::bot::SharedStore;
use crate::config::Config;
use crate::engine::RosterEngine;
use crate::error::RosterError;
use crate::render;
use crate::utils::command_helpers::{get_guild_id, get_optional_string_option, get_string_option};
use crate::utils::guild::{find_channel_by_name, member_has_role};
use crate::utils::responses::ephemeral_response;

pub fn toggle_command() -> CreateCommand {
    CreateCommand::new("planday")
        .description("Slå Planday til eller fra (Disponent)")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "tilstand",
                "til eller fra",
            )
            .required(true)
            .add_string_choice("til", "til")
            .add_string_choice("fra", "fra"),
        )
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "note",
                "Valgfri note, vises mens systemet er slået fra",
            )
            .required(false)
            .max_length(200),
        )
}

pub fn status_command() -> CreateCommand {
    CreateCommand::new("planday-status").description("Vis om Planday er slået til eller fra")
}

pub async fn toggle(
    ctx: &Context,
    command: &CommandInteraction,
    data: SharedStore,
    config: Arc<Config>,
) -> serenity::Result<()> {
    let guild_id = get_guild_id(command)?;
    info!("Planday toggle executed by user {}", command.user.id);

    let is_disponent = match &command.member {
        Some(member) => member_has_role(ctx, guild_id, member, &config.role_disponent).await?,
        None => false,
    };
    if !is_disponent {
        let text = format!(
            "Kun **{}** kan bruge denne kommando.",
            config.role_disponent
        );
        command
            .create_response(&ctx.http, ephemeral_response(&text))
            .await?;
        return Ok(());
    }

    let enable = get_string_option(command, "tilstand")? == "til";
    let note = get_optional_string_option(command, "note");
    let guild_key = guild_id.to_string();

    let engine = RosterEngine::new(data.clone());
    let result = engine
        .set_system_enabled(&guild_key, enable, &command.user.id.to_string(), note)
        .await;

    let reply = match result {
        Ok(downtime) => {
            update_status_message(ctx, &data, &config, guild_id, enable, downtime).await;
            if enable {
                let downtime = downtime
                    .map(render::format_duration)
                    .unwrap_or_else(|| "ukendt".to_string());
                format!("✅ Planday er aktiveret igen. Samlet nedetid: {}", downtime)
            } else {
                "⛔ Planday er deaktiveret.".to_string()
            }
        }
        Err(RosterError::AlreadyInState) => {
            if enable {
                "Planday er allerede aktiveret.".to_string()
            } else {
                "Planday er allerede deaktiveret.".to_string()
            }
        }
        Err(e) => {
            warn!("Toggle failed for guild {}: {}", guild_key, e);
            format!("Fejl: {}", e)
        }
    };

    command
        .create_response(&ctx.http, ephemeral_response(&reply))
        .await?;
    Ok(())
}

/// Maintain the single standing status message in the roster channel:
/// post one on disable, finalize and detach it on enable. Best-effort; the
/// toggle itself already succeeded.
async fn update_status_message(
    ctx: &Context,
    data: &SharedStore,
    config: &Config,
    guild_id: serenity::model::id::GuildId,
    enabled: bool,
    downtime: Option<chrono::Duration>,
) {
    let guild_key = guild_id.to_string();
    let channel = match find_channel_by_name(ctx, guild_id, &config.channel_name).await {
        Ok(Some(ch)) => ch,
        _ => return,
    };

    if enabled {
        let existing = {
            let store = data.read().await;
            store.system(&guild_key).active_status_message_id
        };
        if let Some(id) = existing.and_then(|id| id.parse::<u64>().ok()) {
            let text = render::enabled_status_text(downtime.unwrap_or_else(chrono::Duration::zero));
            if let Err(e) = channel
                .edit_message(&ctx.http, MessageId::new(id), EditMessage::new().content(text))
                .await
            {
                warn!("Could not finalize status message for guild {}: {}", guild_key, e);
            }
        }
        let mut store = data.write().await;
        if let Err(e) = store.set_status_message(&guild_key, None).await {
            warn!("Could not clear status message id for guild {}: {}", guild_key, e);
        }
    } else {
        // Replace any previous status message so at most one is live.
        let previous = {
            let store = data.read().await;
            store.system(&guild_key).active_status_message_id
        };
        if let Some(id) = previous.and_then(|id| id.parse::<u64>().ok()) {
            let _ = channel.delete_message(&ctx.http, MessageId::new(id)).await;
        }

        let state = {
            let store = data.read().await;
            store.system(&guild_key)
        };
        let text = render::disabled_status_text(&state, chrono::Duration::zero());
        match channel
            .send_message(&ctx.http, CreateMessage::new().content(text))
            .await
        {
            Ok(sent) => {
                let mut store = data.write().await;
                if let Err(e) = store
                    .set_status_message(&guild_key, Some(sent.id.to_string()))
                    .await
                {
                    warn!("Could not record status message for guild {}: {}", guild_key, e);
                }
            }
            Err(e) => warn!("Could not post status message for guild {}: {}", guild_key, e),
        }
    }
}

pub async fn status(
    ctx: &Context,
    command: &CommandInteraction,
    data: SharedStore,
) -> serenity::Result<()> {
    let guild_id = get_guild_id(command)?;
    let state = {
        let store = data.read().await;
        store.system(&guild_id.to_string())
    };

    let text = if state.enabled {
        "✅ Planday er aktiveret.".to_string()
    } else {
        let downtime = state
            .disabled_since
            .map(|since| Utc::now() - since)
            .unwrap_or_else(chrono::Duration::zero);
        render::disabled_status_text(&state, downtime)
    };
    command
        .create_response(&ctx.http, ephemeral_response(&text))
        .await?;
    Ok(())
}
