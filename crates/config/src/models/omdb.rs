use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};
use crate::ConfigResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OmdbConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for OmdbConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "http://www.omdbapi.com/".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl ConfigValidator for OmdbConfig {
    fn validate(&self) -> ConfigResult<()> {
        ValidationUtils::validate_url(&self.base_url, &["http", "https"], "omdb.base_url")?;
        ValidationUtils::validate_timeout_seconds(self.timeout_seconds, "omdb.timeout_seconds")?;
        Ok(())
    }
}
