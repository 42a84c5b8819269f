use serenity::builder::{CreateInteractionResponse, CreateInteractionResponseMessage};

/// Ephemeral reply visible only to the requester. All command feedback and
/// domain-error surfacing goes through this.
pub fn ephemeral_response(message: &str) -> CreateInteractionResponse {
    let data = CreateInteractionResponseMessage::new()
        .content(message)
        .ephemeral(true);
    CreateInteractionResponse::Message(data)
}
