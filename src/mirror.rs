use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serenity::builder::{CreateMessage, EditMessage};
use serenity::model::id::{GuildId, MessageId, UserId};
use serenity::prelude::Context;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::bot::SharedStore;
use crate::config::Config;
use crate::engine::compute_missing;
use crate::store::Posting;
use crate::utils::guild::guild_roster;

// Discord DM content cap with headroom, as in the original overview.
const MAX_OVERVIEW_CHARS: usize = 1900;

fn resolve_names(ids: &[String], names: &HashMap<String, String>) -> String {
    if ids.is_empty() {
        return "Ingen endnu".to_string();
    }
    let mut resolved: Vec<String> = ids
        .iter()
        .map(|id| names.get(id).cloned().unwrap_or_else(|| format!("<@{}>", id)))
        .collect();
    resolved.sort_by_key(|n| n.to_lowercase());
    resolved.join(", ")
}

/// The full admin overview for a posting, recomputed from scratch on every
/// call. Also used by the sweep and the daily post, so it takes everything it
/// needs as arguments and touches no I/O.
pub fn build_overview(
    posting: &Posting,
    required: &BTreeSet<String>,
    names: &HashMap<String, String>,
    staff_role: &str,
    stamp: DateTime<Tz>,
) -> String {
    let missing = compute_missing(posting, required);
    let missing_ids: Vec<String> = missing.iter().cloned().collect();
    let missing_names = if missing.is_empty() {
        "Alle har reageret ✅".to_string()
    } else {
        resolve_names(&missing_ids, names)
    };

    let text = format!(
        "📌 **Vagtplan status** (opdateret {stamp})\n\
         🆔 Vagtplan-besked: `{id}`\n\
         👥 Grundlag: **{role}** = {required_count}\n\n\
         ✅ Deltager: **{att_count}**\n   {att}\n\
         🕓 Deltager senere: **{later_count}**\n   {later}\n\
         ❌ Fraværende: **{abs_count}**\n   {abs}\n\
         🧭 Disponering: **{disp_count}**\n   {disp}\n\n\
         ⏳ Mangler at reagere: **{missing_count}**\n   {missing}",
        stamp = stamp.format("%d-%m-%Y %H:%M:%S"),
        id = posting.id,
        role = staff_role,
        required_count = required.len(),
        att_count = posting.attending.len(),
        att = resolve_names(&posting.attending, names),
        later_count = posting.attending_later.len(),
        later = resolve_names(&posting.attending_later, names),
        abs_count = posting.absent.len(),
        abs = resolve_names(&posting.absent, names),
        disp_count = posting.dispatcher.len(),
        disp = resolve_names(&posting.dispatcher, names),
        missing_count = missing.len(),
        missing = missing_names,
    );

    text.chars().take(MAX_OVERVIEW_CHARS).collect()
}

/// Refresh the admin DM for a posting: edit the recorded message in place,
/// or send and record a new one the first time.
///
/// Best-effort by contract. Every failure is logged and swallowed here so a
/// button press, sweep or daily post never fails on the mirror. Suitable for
/// `tokio::spawn`.
pub async fn refresh(
    ctx: Context,
    data: SharedStore,
    config: Arc<Config>,
    guild_id: GuildId,
    posting_id: String,
) {
    if let Err(e) = try_refresh(&ctx, &data, &config, guild_id, &posting_id).await {
        warn!(
            "Admin mirror update failed for posting {} in guild {}: {}",
            posting_id, guild_id, e
        );
    }
}

async fn try_refresh(
    ctx: &Context,
    data: &SharedStore,
    config: &Config,
    guild_id: GuildId,
    posting_id: &str,
) -> anyhow::Result<()> {
    let (required, names) = guild_roster(ctx, guild_id, &config.staff_role_name).await?;

    let guild_key = guild_id.to_string();
    let (content, existing_dm_id) = {
        let store = data.read().await;
        let posting = store.get_posting(&guild_key, posting_id)?;
        let stamp = Utc::now().with_timezone(&config.timezone);
        (
            build_overview(posting, &required, &names, &config.staff_role_name, stamp),
            store.admin_dm_id(&guild_key, posting_id),
        )
    };

    let admin = UserId::new(config.admin_discord_id);
    let dm = admin.create_dm_channel(&ctx.http).await?;

    if let Some(id) = existing_dm_id {
        if let Ok(message_id) = id.parse::<u64>() {
            let edit = EditMessage::new().content(content.clone());
            if dm
                .id
                .edit_message(&ctx.http, MessageId::new(message_id), edit)
                .await
                .is_ok()
            {
                debug!("Updated admin mirror for posting {}", posting_id);
                return Ok(());
            }
            // Recorded message is gone; fall through and send a fresh one.
        }
    }

    let sent = dm
        .id
        .send_message(&ctx.http, CreateMessage::new().content(content))
        .await?;
    let mut store = data.write().await;
    store
        .set_admin_dm_id(&guild_key, posting_id, &sent.id.to_string())
        .await?;
    debug!("Created admin mirror for posting {}", posting_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::Copenhagen;

    fn posting_with(attending: &[&str], absent: &[&str]) -> Posting {
        Posting {
            id: "m1".into(),
            guild_id: "g1".into(),
            created_at: Utc::now(),
            start_time: "19:30".into(),
            note: None,
            attending: attending.iter().map(|s| s.to_string()).collect(),
            attending_later: Vec::new(),
            absent: absent.iter().map(|s| s.to_string()).collect(),
            dispatcher: Vec::new(),
            reminder_sent: false,
        }
    }

    #[test]
    fn overview_lists_responders_and_missing() {
        let posting = posting_with(&["1"], &[]);
        let required: BTreeSet<String> = ["1", "2"].iter().map(|s| s.to_string()).collect();
        let names: HashMap<String, String> =
            [("1", "A"), ("2", "B")].iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        let stamp = Copenhagen.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();

        let text = build_overview(&posting, &required, &names, "Redder", stamp);
        assert!(text.contains("✅ Deltager: **1**\n   A"));
        assert!(text.contains("⏳ Mangler at reagere: **1**\n   B"));
        assert!(text.contains("👥 Grundlag: **Redder** = 2"));
    }

    #[test]
    fn overview_reports_everyone_responded() {
        let posting = posting_with(&["1"], &["2"]);
        let required: BTreeSet<String> = ["1", "2"].iter().map(|s| s.to_string()).collect();
        let names = HashMap::new();
        let stamp = Copenhagen.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();

        let text = build_overview(&posting, &required, &names, "Redder", stamp);
        assert!(text.contains("Alle har reageret ✅"));
    }

    #[test]
    fn overview_is_capped() {
        let many: Vec<String> = (0..2000).map(|i| i.to_string()).collect();
        let mut posting = posting_with(&[], &[]);
        posting.attending = many.clone();
        let required: BTreeSet<String> = many.into_iter().collect();
        let stamp = Copenhagen.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();

        let text = build_overview(&posting, &required, &HashMap::new(), "Redder", stamp);
        assert!(text.chars().count() <= MAX_OVERVIEW_CHARS);
    }
}
