pub mod admin;
pub mod ping;
pub mod roster;

use serenity::model::application::{Command, CommandInteraction};
use serenity::prelude::*;
use std::sync::Arc;
use tracing::warn;

use crate::bot::SharedStore;
use crate::config::Config;

pub async fn register_commands(ctx: &Context) -> serenity::Result<()> {
    let commands = vec![
        ping::register(),
        roster::register(),
        admin::toggle_command(),
        admin::status_command(),
    ];

    Command::set_global_commands(&ctx.http, commands).await?;
    Ok(())
}

pub async fn handle_command(
    ctx: &Context,
    command: &CommandInteraction,
    data: SharedStore,
    config: Arc<Config>,
) -> serenity::Result<()> {
    match command.data.name.as_str() {
        "ping" => ping::run(ctx, command).await?,
        "vagtplan" => roster::run(ctx, command, data, config).await?,
        "planday" => admin::toggle(ctx, command, data, config).await?,
        "planday-status" => admin::status(ctx, command, data).await?,
        _ => {
            warn!("Unknown command: {}", command.data.name);
        }
    }
    Ok(())
}
