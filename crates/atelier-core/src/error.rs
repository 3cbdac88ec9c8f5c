use thiserror::Error;

/// Top-level error type for Atelier.
///
/// Subsystem crates define their own error types and implement
/// `From<AtelierError>` so that `?` works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AtelierError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown event category: {0}")]
    UnknownCategory(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for AtelierError {
    fn from(err: toml::de::Error) -> Self {
        AtelierError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AtelierError {
    fn from(err: toml::ser::Error) -> Self {
        AtelierError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AtelierError {
    fn from(err: serde_json::Error) -> Self {
        AtelierError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Atelier operations.
pub type Result<T> = std::result::Result<T, AtelierError>;
