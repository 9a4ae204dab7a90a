use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Rejected before any store mutation.
    #[error("validation failed: {0}")]
    Validation(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(String),

    /// The durable tier is unreachable. Account operations are fatal without
    /// it; anonymous save/load degrade to memory-only instead.
    #[error("durable store unavailable: {0}")]
    Unavailable(String),

    #[error("credential rejected")]
    CredentialRejected,

    #[error("no account with id number {0}")]
    NoAccount(String),

    /// Collision retry cap hit while minting a code. The code space is large
    /// relative to expected concurrency, so this is an internal error.
    #[error("code space exhausted after {0} attempts")]
    CodeSpaceExhausted(usize),

    #[error("corrupt durable row: {0}")]
    Decode(String),

    #[error(transparent)]
    Pad(#[from] pad_core::PadError),
}

impl StoreError {
    /// Collapse any durable-tier failure into `Unavailable`.
    pub(crate) fn into_unavailable(self) -> StoreError {
        match self {
            StoreError::Unavailable(_) => self,
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}
