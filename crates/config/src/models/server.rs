use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};
use crate::ConfigResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost".to_string(),
                "http://localhost:3000".to_string(),
            ],
            request_timeout_seconds: 30,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl ConfigValidator for ServerConfig {
    fn validate(&self) -> ConfigResult<()> {
        ValidationUtils::validate_not_empty(&self.host, "server.host")?;
        ValidationUtils::validate_port(self.port, "server.port")?;
        ValidationUtils::validate_timeout_seconds(
            self.request_timeout_seconds,
            "server.request_timeout_seconds",
        )?;
        for origin in &self.cors_origins {
            if origin != "*" {
                ValidationUtils::validate_url(origin, &["http", "https"], "server.cors_origins")?;
            }
        }
        Ok(())
    }
}
