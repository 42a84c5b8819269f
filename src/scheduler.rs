use chrono::{NaiveDate, Timelike, Utc};
use serenity::builder::{CreateMessage, EditMessage, GetMessages};
use serenity::model::id::{GuildId, MessageId, UserId};
use serenity::prelude::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::bot::SharedStore;
use crate::config::Config;
use crate::engine::RosterEngine;
use crate::mirror;
use crate::render;
use crate::store::{CurrentPosting, Posting};
use crate::sweeper::{Notifier, ReminderSweeper};
use crate::utils::guild::{find_channel_by_name, guild_roster};

/// DM delivery through the gateway connection. Closed DMs and unknown users
/// count as unreachable, not as errors.
struct DmNotifier<'a> {
    ctx: &'a Context,
}

#[serenity::async_trait]
impl Notifier for DmNotifier<'_> {
    async fn send(&self, responder: &str, text: &str) -> bool {
        let user_id = match responder.parse::<u64>() {
            Ok(id) => UserId::new(id),
            Err(_) => return false,
        };
        let dm = match user_id.create_dm_channel(&self.ctx.http).await {
            Ok(dm) => dm,
            Err(_) => return false,
        };
        dm.id
            .send_message(&self.ctx.http, CreateMessage::new().content(text))
            .await
            .is_ok()
    }
}

/// Drives the three periodic jobs: the daily post, the reminder sweep and
/// the downtime clock, plus the midnight message cleanup.
pub struct Scheduler {
    data: SharedStore,
    config: Arc<Config>,
    sweeper: ReminderSweeper,
    last_cleanup: Mutex<Option<NaiveDate>>,
}

impl Scheduler {
    pub fn new(data: SharedStore, config: Arc<Config>) -> Self {
        let sweeper = ReminderSweeper::new(
            data.clone(),
            config.reminder_after_post_minutes,
            config.timezone,
        );
        Self {
            data,
            config,
            sweeper,
            last_cleanup: Mutex::new(None),
        }
    }

    pub async fn start(&self, ctx: Context) {
        info!("Starting scheduler loop");
        loop {
            sleep(Duration::from_secs(60)).await;

            if let Err(e) = self.daily_post_tick(&ctx).await {
                error!("Daily post tick failed: {}", e);
            }
            if let Err(e) = self.reminder_tick(&ctx).await {
                error!("Reminder tick failed: {}", e);
            }
            self.downtime_clock_tick(&ctx).await;
            if let Err(e) = self.midnight_cleanup_tick(&ctx).await {
                error!("Midnight cleanup failed: {}", e);
            }
        }
    }

    /// Post the roster in every guild once the configured local time is
    /// reached, at most once per guild per day.
    async fn daily_post_tick(&self, ctx: &Context) -> anyhow::Result<()> {
        let now_local = Utc::now().with_timezone(&self.config.timezone);
        let target = self.config.auto_post_time;
        let minutes_off = (now_local.time().hour() * 60 + now_local.time().minute()) as i32
            - (target.hour() * 60 + target.minute()) as i32;
        if minutes_off.abs() >= 1 {
            return Ok(());
        }

        for guild_id in ctx.cache.guilds() {
            let guild_key = guild_id.to_string();
            {
                let store = self.data.read().await;
                if !store.system(&guild_key).enabled {
                    debug!("Daily post suppressed: guild {} disabled", guild_key);
                    continue;
                }
                if store
                    .current_posting(&guild_key, now_local.date_naive())
                    .is_some()
                {
                    continue;
                }
            }
            match post_roster(ctx, &self.data, &self.config, guild_id, None).await {
                Ok(posting_id) => {
                    info!("Daily roster {} posted for guild {}", posting_id, guild_key)
                }
                Err(e) => warn!("Could not post daily roster for guild {}: {}", guild_key, e),
            }
        }
        Ok(())
    }

    async fn reminder_tick(&self, ctx: &Context) -> anyhow::Result<()> {
        let now = Utc::now();
        let today = now.with_timezone(&self.config.timezone).date_naive();

        for guild_id in ctx.cache.guilds() {
            let guild_key = guild_id.to_string();

            // Cheap precheck before fetching the member list; the sweeper
            // re-validates under its own lock.
            let current = {
                let store = self.data.read().await;
                if !store.system(&guild_key).enabled {
                    continue;
                }
                let current = match store.current_posting(&guild_key, today) {
                    Some(cur) => cur.clone(),
                    None => continue,
                };
                match store.get_posting(&guild_key, &current.posting_id) {
                    Ok(posting) if !posting.reminder_sent => current,
                    _ => continue,
                }
            };

            let (required, _) =
                match guild_roster(ctx, guild_id, &self.config.staff_role_name).await {
                    Ok(roster) => roster,
                    Err(e) => {
                        warn!("Could not load member roster for guild {}: {}", guild_key, e);
                        continue;
                    }
                };

            let link = format!(
                "https://discord.com/channels/{}/{}/{}",
                guild_key, current.channel_id, current.posting_id
            );
            let text = format!("{}\n🔗 {}", self.config.reminder_dm_text, link);
            let notifier = DmNotifier { ctx };

            match self
                .sweeper
                .sweep_guild(&guild_key, &required, now, &text, &notifier)
                .await
            {
                Ok(Some(outcome)) => {
                    tokio::spawn(mirror::refresh(
                        ctx.clone(),
                        self.data.clone(),
                        self.config.clone(),
                        guild_id,
                        outcome.posting_id,
                    ));
                }
                Ok(None) => {}
                Err(e) => warn!("Sweep failed for guild {}: {}", guild_key, e),
            }
        }
        Ok(())
    }

    /// While a guild is disabled, keep its standing status message showing
    /// the live downtime.
    async fn downtime_clock_tick(&self, ctx: &Context) {
        let now = Utc::now();
        for guild_id in ctx.cache.guilds() {
            let guild_key = guild_id.to_string();
            let state = {
                let store = self.data.read().await;
                store.system(&guild_key)
            };
            if state.enabled {
                continue;
            }
            let (message_id, since) =
                match (&state.active_status_message_id, state.disabled_since) {
                    (Some(id), Some(since)) => (id.clone(), since),
                    _ => continue,
                };
            let Ok(message_id) = message_id.parse::<u64>() else {
                continue;
            };

            let channel =
                match find_channel_by_name(ctx, guild_id, &self.config.channel_name).await {
                    Ok(Some(ch)) => ch,
                    _ => continue,
                };
            let text = render::disabled_status_text(&state, now - since);
            if let Err(e) = channel
                .edit_message(
                    &ctx.http,
                    MessageId::new(message_id),
                    EditMessage::new().content(text),
                )
                .await
            {
                debug!("Downtime clock edit failed for guild {}: {}", guild_key, e);
            }
        }
    }

    /// At local midnight, delete yesterday's rendered bot messages from the
    /// roster channel. The data model keeps its records.
    async fn midnight_cleanup_tick(&self, ctx: &Context) -> anyhow::Result<()> {
        let now_local = Utc::now().with_timezone(&self.config.timezone);
        if now_local.time().hour() != 0 {
            return Ok(());
        }
        let today = now_local.date_naive();
        {
            let mut last = self.last_cleanup.lock().await;
            if *last == Some(today) {
                return Ok(());
            }
            *last = Some(today);
        }

        for guild_id in ctx.cache.guilds() {
            let guild_key = guild_id.to_string();
            let keep = {
                let store = self.data.read().await;
                store.system(&guild_key).active_status_message_id
            };
            if let Err(e) = delete_bot_messages(ctx, &self.config, guild_id, keep.as_deref()).await
            {
                warn!("Cleanup failed for guild {}: {}", guild_key, e);
            }
        }
        Ok(())
    }
}

/// Remove the bot's previous messages from the roster channel so only one
/// posting is ever live, sparing the standing status message if there is one.
pub async fn delete_bot_messages(
    ctx: &Context,
    config: &Config,
    guild_id: GuildId,
    keep_message_id: Option<&str>,
) -> anyhow::Result<()> {
    let channel = match find_channel_by_name(ctx, guild_id, &config.channel_name).await? {
        Some(ch) => ch,
        None => return Ok(()),
    };
    let bot_id = ctx.cache.current_user().id;
    let messages = channel
        .messages(&ctx.http, GetMessages::new().limit(100))
        .await?;
    for message in messages {
        if message.author.id != bot_id {
            continue;
        }
        if keep_message_id == Some(message.id.to_string().as_str()) {
            continue;
        }
        if let Err(e) = message.delete(&ctx.http).await {
            debug!("Could not delete old bot message {}: {}", message.id, e);
        }
    }
    Ok(())
}

/// Send today's roster in a guild and register it as the current posting.
/// Shared by the daily job and the `/vagtplan` command.
pub async fn post_roster(
    ctx: &Context,
    data: &SharedStore,
    config: &Arc<Config>,
    guild_id: GuildId,
    note: Option<String>,
) -> anyhow::Result<String> {
    let guild_key = guild_id.to_string();
    let channel = find_channel_by_name(ctx, guild_id, &config.channel_name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("kanalen '{}' blev ikke fundet", config.channel_name))?;

    let keep = {
        let store = data.read().await;
        store.system(&guild_key).active_status_message_id
    };
    delete_bot_messages(ctx, config, guild_id, keep.as_deref()).await?;

    let note = note.or_else(|| Some(config.auto_message.clone()));
    let created_at = Utc::now();
    let today = created_at.with_timezone(&config.timezone).date_naive();
    let draft = Posting::draft(&guild_key, created_at, &config.auto_start_time, note.clone());

    let sent = channel
        .send_message(
            &ctx.http,
            CreateMessage::new()
                .content("@everyone")
                .embed(render::roster_embed(&draft, today))
                .components(render::roster_buttons()),
        )
        .await?;

    let posting_id = sent.id.to_string();
    let engine = RosterEngine::new(data.clone());
    engine
        .create_posting(
            &guild_key,
            &posting_id,
            created_at,
            &config.auto_start_time,
            note,
        )
        .await?;
    {
        let mut store = data.write().await;
        store
            .set_current(
                &guild_key,
                CurrentPosting {
                    posting_id: posting_id.clone(),
                    channel_id: channel.to_string(),
                    date: today,
                },
            )
            .await?;
    }

    tokio::spawn(mirror::refresh(
        ctx.clone(),
        data.clone(),
        config.clone(),
        guild_id,
        posting_id.clone(),
    ));
    Ok(posting_id)
}
