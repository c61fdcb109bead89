use thiserror::Error;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    /// Short label used as the `kind` field on diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::Configuration(_) => "configuration",
            BridgeError::Validation(_) => "validation",
            BridgeError::Unsupported(_) => "unsupported",
            BridgeError::Settings(_) => "settings",
            BridgeError::Serialization(_) => "serialization",
        }
    }
}
