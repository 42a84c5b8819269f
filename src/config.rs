use anyhow::{anyhow, Result};
use chrono::NaiveTime;
use chrono_tz::Tz;
use std::env;
use std::path::PathBuf;

/// Process configuration, read once at startup from the environment
/// (with `.env` support).
#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    /// Name of the text channel the roster is posted in.
    pub channel_name: String,
    /// Role allowed to use the dispatcher button and the admin commands.
    pub role_disponent: String,
    /// Role whose members make up the required-responder set.
    pub staff_role_name: String,
    /// Recipient of the admin overview DM.
    pub admin_discord_id: u64,
    pub timezone: Tz,
    /// Local wall-clock time of the daily post.
    pub auto_post_time: NaiveTime,
    /// Display-only shift start time shown in the embed.
    pub auto_start_time: String,
    pub auto_message: String,
    /// Minutes after the daily post before unresponsive members get a DM.
    pub reminder_after_post_minutes: i64,
    pub reminder_dm_text: String,
    pub data_file_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let discord_token = env::var("DISCORD_TOKEN")
            .map_err(|_| anyhow!("DISCORD_TOKEN environment variable is required"))?;

        let channel_name = env::var("CHANNEL_NAME")
            .unwrap_or_else(|_| "🗓️┃planday-dagens-vagtplan".to_string());
        let role_disponent =
            env::var("ROLE_DISPONENT").unwrap_or_else(|_| "Disponent".to_string());
        let staff_role_name =
            env::var("STAFF_ROLE_NAME").unwrap_or_else(|_| "Redder".to_string());

        let admin_discord_id = env::var("ADMIN_DISCORD_ID")
            .map_err(|_| anyhow!("ADMIN_DISCORD_ID environment variable is required"))?
            .parse::<u64>()
            .map_err(|_| anyhow!("ADMIN_DISCORD_ID must be a numeric user id"))?;

        let timezone: Tz = env::var("TIMEZONE")
            .unwrap_or_else(|_| "Europe/Copenhagen".to_string())
            .parse()
            .map_err(|e| anyhow!("invalid TIMEZONE: {}", e))?;

        let auto_post_time = NaiveTime::parse_from_str(
            &env::var("AUTO_POST_TIME").unwrap_or_else(|_| "12:00".to_string()),
            "%H:%M",
        )
        .map_err(|e| anyhow!("AUTO_POST_TIME must be HH:MM: {}", e))?;

        let auto_start_time = env::var("AUTO_START_TIME")
            .unwrap_or_else(|_| "19:30".to_string())
            .trim()
            .to_string();

        let auto_message = env::var("AUTO_MESSAGE").unwrap_or_else(|_| {
            "Automatisk vagtplan – husk at stemple ind hvad bil du kører i.".to_string()
        });

        let reminder_after_post_minutes = env::var("REMINDER_AFTER_POST_MINUTES")
            .unwrap_or_else(|_| "420".to_string())
            .parse::<i64>()
            .map_err(|_| anyhow!("REMINDER_AFTER_POST_MINUTES must be a number of minutes"))?;

        let reminder_dm_text = env::var("REMINDER_DM_TEXT").unwrap_or_else(|_| {
            "⏰ Husk at reagere på dagens vagtplan (Deltager / Senere / Fraværende).".to_string()
        });

        let data_file_path = PathBuf::from(
            env::var("DATA_FILE_PATH").unwrap_or_else(|_| "planday_state.json".to_string()),
        );

        Ok(Config {
            discord_token,
            channel_name,
            role_disponent,
            staff_role_name,
            admin_discord_id,
            timezone,
            auto_post_time,
            auto_start_time,
            auto_message,
            reminder_after_post_minutes,
            reminder_dm_text,
            data_file_path,
        })
    }
}
