use thiserror::Error;

/// Top-level error type for Hibiki.
#[derive(Debug, Error)]
pub enum HibikiError {
    /// Error from the chat transport (resolution, page fetch, or send).
    #[error("transport error: {0}")]
    Transport(String),

    /// Error from the generative text service.
    #[error("generation error: {0}")]
    Generation(String),

    /// Persona catalog error (malformed or missing entries).
    #[error("persona error: {0}")]
    Persona(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Watcher lifecycle error (e.g. already running).
    #[error("watcher error: {0}")]
    Watcher(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
