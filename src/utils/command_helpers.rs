use serenity::model::application::{CommandDataOptionValue, CommandInteraction};
use serenity::model::id::GuildId;

/// Guild the command was invoked in, or an error for DM invocations.
pub fn get_guild_id(command: &CommandInteraction) -> serenity::Result<GuildId> {
    command
        .guild_id
        .ok_or(serenity::Error::Other("This command can only be used in a server"))
}

/// A required string option, trimmed.
pub fn get_string_option(command: &CommandInteraction, name: &str) -> serenity::Result<String> {
    let option = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .ok_or(serenity::Error::Other("Missing required argument"))?;

    match &option.value {
        CommandDataOptionValue::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Err(serenity::Error::Other("Argument cannot be empty"))
            } else {
                Ok(trimmed.to_string())
            }
        }
        _ => Err(serenity::Error::Other("Argument is not a string")),
    }
}

/// An optional string option; None when absent or blank.
pub fn get_optional_string_option(command: &CommandInteraction, name: &str) -> Option<String> {
    command.data.options.iter().find(|opt| opt.name == name).and_then(|opt| {
        match &opt.value {
            CommandDataOptionValue::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            _ => None,
        }
    })
}
