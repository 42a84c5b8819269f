use serenity::builder::{CreateCommand, CreateCommandOption};
use serenity::model::application::{CommandInteraction, CommandOptionType};
use serenity::prelude::*;
use std::sync::Arc;
use tracing::{error, info};

use crate::bot::SharedStore;
use crate::config::Config;
use crate::scheduler::post_roster;
use crate::utils::command_helpers::{get_guild_id, get_optional_string_option};
use crate::utils::guild::member_has_role;
use crate::utils::responses::ephemeral_response;

pub fn register() -> CreateCommand {
    CreateCommand::new("vagtplan")
        .description("Send dagens vagtplan i kanalen, med mulighed for besked")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "besked",
                "Valgfri besked der vises i vagtplanen",
            )
            .required(false)
            .max_length(500),
        )
}

pub async fn run(
    ctx: &Context,
    command: &CommandInteraction,
    data: SharedStore,
    config: Arc<Config>,
) -> serenity::Result<()> {
    info!("Vagtplan command executed by user {}", command.user.id);
    let guild_id = get_guild_id(command)?;

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

    {
        let store = data.read().await;
        if !store.system(&guild_id.to_string()).enabled {
            command
                .create_response(
                    &ctx.http,
                    ephemeral_response("Planday er deaktiveret. Brug `/planday til` først."),
                )
                .await?;
            return Ok(());
        }
    }

    // The send can take a moment (old messages get cleaned up first).
    command.defer_ephemeral(&ctx.http).await?;

    let note = get_optional_string_option(command, "besked");
    let content = match post_roster(ctx, &data, &config, guild_id, note).await {
        Ok(_) => "Vagtplan sendt.".to_string(),
        Err(e) => {
            error!("Manual roster post failed in guild {}: {}", guild_id, e);
            format!("Kunne ikke sende vagtplan: {}", e)
        }
    };
    command
        .edit_response(
            &ctx.http,
            serenity::builder::EditInteractionResponse::new().content(content),
        )
        .await?;
    Ok(())
}
