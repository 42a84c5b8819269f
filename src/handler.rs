use serenity::async_trait;
use serenity::builder::{
    CreateInteractionResponse, CreateInteractionResponseFollowup, CreateInteractionResponseMessage,
};
use serenity::model::application::{ComponentInteraction, Interaction};
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

use crate::bot::SharedStore;
use crate::commands;
use crate::config::Config;
use crate::engine::RosterEngine;
use crate::error::RosterError;
use crate::mirror;
use crate::render;
use crate::scheduler::Scheduler;
use crate::store::Status;
use crate::utils::guild::member_has_role;
use crate::utils::responses::ephemeral_response;

pub struct Handler {
    pub data: SharedStore,
    pub config: Arc<Config>,
    scheduler_started: AtomicBool,
}

impl Handler {
    pub fn new(data: SharedStore, config: Arc<Config>) -> Self {
        Self {
            data,
            config,
            scheduler_started: AtomicBool::new(false),
        }
    }

    /// A roster button was pressed: apply the status, refresh the posting
    /// message in place and fire off a mirror update.
    async fn handle_component(
        &self,
        ctx: &Context,
        component: &ComponentInteraction,
    ) -> serenity::Result<()> {
        let Some(status) = Status::from_custom_id(&component.data.custom_id) else {
            return Ok(());
        };
        let Some(guild_id) = component.guild_id else {
            return Ok(());
        };

        let privileged = if status == Status::Dispatcher {
            match &component.member {
                Some(member) => {
                    member_has_role(ctx, guild_id, member, &self.config.role_disponent).await?
                }
                None => false,
            }
        } else {
            false
        };

        let engine = RosterEngine::new(self.data.clone());
        let posting_id = component.message.id.to_string();
        let result = engine
            .apply_status(
                &guild_id.to_string(),
                &posting_id,
                &component.user.id.to_string(),
                status,
                privileged,
            )
            .await;

        match result {
            Ok(posting) => {
                let date = posting
                    .created_at
                    .with_timezone(&self.config.timezone)
                    .date_naive();
                component
                    .create_response(
                        &ctx.http,
                        CreateInteractionResponse::UpdateMessage(
                            CreateInteractionResponseMessage::new()
                                .add_embed(render::roster_embed(&posting, date))
                                .components(render::roster_buttons()),
                        ),
                    )
                    .await?;

                let ack = if status == Status::Dispatcher {
                    "🧭 Opdateret"
                } else {
                    "✅ Registreret"
                };
                component
                    .create_followup(
                        &ctx.http,
                        CreateInteractionResponseFollowup::new()
                            .content(ack)
                            .ephemeral(true),
                    )
                    .await?;

                tokio::spawn(mirror::refresh(
                    ctx.clone(),
                    self.data.clone(),
                    self.config.clone(),
                    guild_id,
                    posting_id,
                ));
            }
            Err(e @ (RosterError::Forbidden | RosterError::NotFound(_))) => {
                component
                    .create_response(&ctx.http, ephemeral_response(&e.to_string()))
                    .await?;
            }
            Err(e) => {
                error!("Status update failed on posting {}: {}", posting_id, e);
                component
                    .create_response(
                        &ctx.http,
                        ephemeral_response("Noget gik galt, prøv igen."),
                    )
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        if let Err(why) = commands::register_commands(&ctx).await {
            error!("Failed to register slash commands: {}", why);
        } else {
            info!("Successfully registered slash commands");
        }

        // ready can fire again on reconnect; the scheduler starts once
        if !self.scheduler_started.swap(true, Ordering::SeqCst) {
            let scheduler = Scheduler::new(self.data.clone(), self.config.clone());
            tokio::spawn(async move {
                scheduler.start(ctx).await;
            });
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) => {
                if let Err(why) = commands::handle_command(
                    &ctx,
                    &command,
                    self.data.clone(),
                    self.config.clone(),
                )
                .await
                {
                    error!("Error handling command {}: {}", command.data.name, why);
                }
            }
            Interaction::Component(component) => {
                if let Err(why) = self.handle_component(&ctx, &component).await {
                    error!("Error handling component interaction: {}", why);
                }
            }
            _ => {}
        }
    }
}
