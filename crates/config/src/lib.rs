pub mod models;
pub mod validation;

pub use models::{
    AppConfig, BrokerConfig, BrokerType, LogConfig, LogLevel, OmdbConfig, OutputFormat,
    ServerConfig,
};
pub use validation::{ConfigValidator, ValidationUtils};

/// Configuration error type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration error enumeration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<url::ParseError> for ConfigError {
    fn from(err: url::ParseError) -> Self {
        ConfigError::Validation(err.to_string())
    }
}
