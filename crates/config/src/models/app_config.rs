use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{broker::BrokerConfig, logging::LogConfig, omdb::OmdbConfig, server::ServerConfig};
use crate::validation::ConfigValidator;

/// 环境变量前缀，嵌套字段用双下划线分隔，例如 `MOVIE_BACKEND_BROKER__HOST`
pub const ENV_PREFIX: &str = "MOVIE_BACKEND";

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["config/movie-backend.toml", "movie-backend.toml"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: String,
    pub server: ServerConfig,
    pub broker: BrokerConfig,
    pub omdb: OmdbConfig,
    pub logging: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "dev".to_string(),
            server: ServerConfig::default(),
            broker: BrokerConfig::default(),
            omdb: OmdbConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        Self::load_from(config_path, ENV_PREFIX)
    }

    /// 按 默认值 -> 配置文件 -> 环境变量 的顺序叠加配置
    pub fn load_from(config_path: Option<&str>, env_prefix: &str) -> Result<Self> {
        let defaults =
            ConfigBuilder::try_from(&AppConfig::default()).context("构建默认配置失败")?;
        let mut builder = ConfigBuilder::builder().add_source(defaults);

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("server.cors_origins"),
        );

        let mut config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        if config.omdb.api_key.is_empty() {
            if let Ok(key) = std::env::var("OMDB_API_KEY") {
                config.omdb.api_key = key;
            }
        }

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        self.server.validate()?;
        self.broker.validate()?;
        self.omdb.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
