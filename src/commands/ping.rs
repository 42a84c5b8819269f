use serenity::builder::CreateCommand;
use serenity::model::application::CommandInteraction;
use serenity::prelude::*;
use tracing::debug;

use crate::utils::responses::ephemeral_response;

pub fn register() -> CreateCommand {
    CreateCommand::new("ping").description("Test at botten svarer")
}

pub async fn run(ctx: &Context, command: &CommandInteraction) -> serenity::Result<()> {
    debug!("Ping command from user {}", command.user.id);
    command
        .create_response(&ctx.http, ephemeral_response("Pong!"))
        .await?;
    Ok(())
}
