use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The document could not be retrieved. Fatal for the epoch that asked for it.
    #[error("Failed to fetch document '{url}': {reason}")]
    Fetch { url: String, reason: String },

    #[error("Failed to spawn worker {slot}: {reason}")]
    WorkerSpawn { slot: usize, reason: String },

    /// A single paragraph could not be scored; the search carries on without it.
    #[error("Cannot score paragraph: {0}")]
    MatchComputation(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
