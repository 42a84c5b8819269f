use serenity::model::guild::Member;
use serenity::model::id::{ChannelId, GuildId};
use serenity::prelude::Context;
use std::collections::{BTreeSet, HashMap};

/// The required-responder set for a guild plus a display-name lookup for
/// every member we saw while building it.
///
/// Members of the staff role form the required set; an empty or missing role
/// means "unknown" and falls back to every non-bot member.
pub async fn guild_roster(
    ctx: &Context,
    guild_id: GuildId,
    staff_role: &str,
) -> serenity::Result<(BTreeSet<String>, HashMap<String, String>)> {
    let roles = guild_id.roles(&ctx.http).await?;
    let staff_role_id = roles.iter().find_map(|(id, role)| {
        if role.name == staff_role {
            Some(*id)
        } else {
            None
        }
    });

    let members = guild_id.members(&ctx.http, None, None).await?;
    let mut names = HashMap::new();
    let mut required = BTreeSet::new();

    for member in &members {
        if member.user.bot {
            continue;
        }
        names.insert(
            member.user.id.to_string(),
            member.display_name().to_string(),
        );
        let is_staff = match staff_role_id {
            Some(role_id) => member.roles.contains(&role_id),
            None => false,
        };
        if is_staff {
            required.insert(member.user.id.to_string());
        }
    }

    if required.is_empty() {
        required = names.keys().cloned().collect();
    }

    Ok((required, names))
}

/// Whether a member holds a role, matched by name.
pub async fn member_has_role(
    ctx: &Context,
    guild_id: GuildId,
    member: &Member,
    role_name: &str,
) -> serenity::Result<bool> {
    let roles = guild_id.roles(&ctx.http).await?;
    Ok(member
        .roles
        .iter()
        .any(|rid| roles.get(rid).map(|r| r.name == role_name).unwrap_or(false)))
}

/// Find a guild text channel by its exact name.
pub async fn find_channel_by_name(
    ctx: &Context,
    guild_id: GuildId,
    name: &str,
) -> serenity::Result<Option<ChannelId>> {
    let channels = guild_id.channels(&ctx.http).await?;
    Ok(channels
        .iter()
        .find(|(_, ch)| ch.name == name)
        .map(|(id, _)| *id))
}
