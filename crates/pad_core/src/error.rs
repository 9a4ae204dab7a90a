use thiserror::Error;

#[derive(Debug, Error)]
pub enum PadError {
    #[error("credential hashing failed: {0}")]
    Hash(String),

    #[error("stored credential is malformed: {0}")]
    MalformedHash(String),
}
