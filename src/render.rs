use chrono::{Datelike, Duration, NaiveDate};
use serenity::builder::{CreateActionRow, CreateButton, CreateEmbed, CreateEmbedFooter};
use serenity::model::application::ButtonStyle;

use crate::store::{Posting, Status, SystemState};

const EMBED_COLOR: u32 = 0x2b90d9;

/// "mandag den 3. marts" style date line.
pub fn danish_date(d: NaiveDate) -> String {
    const DAYS: [&str; 7] = [
        "mandag", "tirsdag", "onsdag", "torsdag", "fredag", "lørdag", "søndag",
    ];
    const MONTHS: [&str; 12] = [
        "januar",
        "februar",
        "marts",
        "april",
        "maj",
        "juni",
        "juli",
        "august",
        "september",
        "oktober",
        "november",
        "december",
    ];
    format!(
        "{} den {}. {}",
        DAYS[d.weekday().num_days_from_monday() as usize],
        d.day(),
        MONTHS[d.month0() as usize]
    )
}

fn mention_lines(ids: &[String]) -> String {
    if ids.is_empty() {
        "Ingen endnu".to_string()
    } else {
        ids.iter()
            .map(|id| format!("<@{}>", id))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn roster_embed(posting: &Posting, date: NaiveDate) -> CreateEmbed {
    let date_line = danish_date(date);
    CreateEmbed::new()
        .title(format!("Dagens vagtplan for {}", date_line))
        .description("Husk og stemple ind hvad bil du kører i.")
        .colour(EMBED_COLOR)
        .field(
            "🕒 Starttid",
            format!("{} kl. {}", date_line, posting.start_time),
            false,
        )
        .field("✅ Deltager", mention_lines(&posting.attending), true)
        .field(
            "🕓 Deltager senere",
            mention_lines(&posting.attending_later),
            true,
        )
        .field("❌ Fraværende", mention_lines(&posting.absent), true)
        .field("🧭 Disponering", mention_lines(&posting.dispatcher), true)
        .field(
            "🗒️ Besked",
            posting.note.clone().unwrap_or_else(|| "Ingen besked sat".to_string()),
            false,
        )
        .footer(CreateEmbedFooter::new("Planday | Vagtplan"))
}

pub fn roster_buttons() -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(vec![
        CreateButton::new(Status::Attending.custom_id())
            .label("Deltager")
            .style(ButtonStyle::Success)
            .emoji('✅'),
        CreateButton::new(Status::AttendingLater.custom_id())
            .label("Deltager senere")
            .style(ButtonStyle::Primary)
            .emoji('🕓'),
        CreateButton::new(Status::Absent.custom_id())
            .label("Fraværende")
            .style(ButtonStyle::Danger)
            .emoji('❌'),
        CreateButton::new(Status::Dispatcher.custom_id())
            .label("Disponent")
            .style(ButtonStyle::Secondary)
            .emoji('🧭'),
    ])]
}

pub fn format_duration(d: Duration) -> String {
    let total_minutes = d.num_minutes().max(0);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours > 0 {
        format!("{}t {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Standing in-channel status message shown while the system is off,
/// refreshed by the downtime clock.
pub fn disabled_status_text(state: &SystemState, downtime: Duration) -> String {
    let by = state
        .disabled_by
        .as_ref()
        .map(|id| format!("<@{}>", id))
        .unwrap_or_else(|| "ukendt".to_string());
    let note = state
        .disabled_note
        .clone()
        .unwrap_or_else(|| "Ingen note".to_string());
    format!(
        "⛔ **Planday er deaktiveret**\n👤 Af: {}\n🗒️ Note: {}\n⏱️ Nedetid: {}",
        by,
        note,
        format_duration(downtime)
    )
}

pub fn enabled_status_text(downtime: Duration) -> String {
    format!(
        "✅ **Planday er aktiveret igen**\n⏱️ Samlet nedetid: {}",
        format_duration(downtime)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn danish_date_formats_weekday_and_month() {
        // 2024-03-04 is a Monday
        let d = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(danish_date(d), "mandag den 4. marts");
        let d = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        assert_eq!(danish_date(d), "søndag den 1. december");
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(Duration::minutes(5)), "5m");
        assert_eq!(format_duration(Duration::minutes(125)), "2t 5m");
        assert_eq!(format_duration(Duration::seconds(-3)), "0m");
    }
}
