use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("GPIO error: {0}")]
    Gpio(String),

    #[error("Command error: {0}")]
    Command(String),
}

/// Result type alias used across the crate
pub type Result<T> = std::result::Result<T, AppError>;
