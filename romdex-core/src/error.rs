/// Errors surfaced by the core data model.
///
/// The index engine itself reports lookup misses as `None`/empty results;
/// only digest validation and the streaming hasher produce real errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid digest: {0}")]
    InvalidDigest(String),
}

impl CoreError {
    pub fn invalid_digest(msg: impl Into<String>) -> Self {
        Self::InvalidDigest(msg.into())
    }
}
