use thiserror::Error;

/// Top-level error type shared by the HacXorZ crates.
///
/// Subsystem crates define their own error types and convert from this one
/// so that `?` works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HacxorzError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<toml::de::Error> for HacxorzError {
    fn from(err: toml::de::Error) -> Self {
        HacxorzError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for HacxorzError {
    fn from(err: toml::ser::Error) -> Self {
        HacxorzError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for HacxorzError {
    fn from(err: serde_json::Error) -> Self {
        HacxorzError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for HacXorZ operations.
pub type Result<T> = std::result::Result<T, HacxorzError>;
