use thiserror::Error;

/// Domain errors that are surfaced directly to the requester.
///
/// Best-effort failures (undeliverable DMs, admin-mirror edits) are not part
/// of this taxonomy; they are logged where they happen and never propagate.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("vagtplan {0} findes allerede for denne server")]
    DuplicateId(String),

    #[error("ukendt vagtplan: {0}")]
    NotFound(String),

    #[error("kun Disponent-rollen kan bruge denne funktion")]
    Forbidden,

    #[error("systemet er allerede i den tilstand")]
    AlreadyInState,

    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}
