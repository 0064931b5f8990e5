use serde::{Deserialize, Serialize};
use url::Url;

use crate::validation::{ConfigValidator, ValidationUtils};
use crate::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrokerType {
    #[default]
    Rabbitmq,
    InMemory,
}

/// 消息代理连接配置
///
/// `url` 设置后优先使用，否则由 host/port/user/password/vhost 拼装。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub r#type: BrokerType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub vhost: String,
    /// 任务投递的路由键，即 worker 监听的队列
    pub queue: String,
    /// 空字符串表示 AMQP 默认交换机
    pub exchange: String,
    pub channel_pool_size: usize,
    pub connection_timeout_ms: u64,
    pub publish_timeout_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            r#type: BrokerType::Rabbitmq,
            url: None,
            host: "localhost".to_string(),
            port: 5672,
            user: "guest".to_string(),
            password: "guest".to_string(),
            vhost: "/".to_string(),
            queue: "celery".to_string(),
            exchange: String::new(),
            channel_pool_size: 10,
            connection_timeout_ms: 5000,
            publish_timeout_ms: 5000,
        }
    }
}

impl BrokerConfig {
    pub fn in_memory_default() -> Self {
        Self {
            r#type: BrokerType::InMemory,
            ..Self::default()
        }
    }

    /// 组装 AMQP 连接地址
    pub fn amqp_url(&self) -> ConfigResult<String> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            ValidationUtils::validate_url(url, &["amqp", "amqps"], "broker.url")?;
            return Ok(url.to_string());
        }

        ValidationUtils::validate_not_empty(&self.host, "broker.host")?;
        let mut url = Url::parse(&format!("amqp://{}:{}", self.host, self.port))?;
        url.set_username(&self.user).map_err(|_| {
            ConfigError::Validation("broker.user cannot be set on this URL".to_string())
        })?;
        url.set_password(Some(&self.password)).map_err(|_| {
            ConfigError::Validation("broker.password cannot be set on this URL".to_string())
        })?;
        url.set_path(&format!("/{}", encode_vhost(&self.vhost)));

        Ok(url.to_string())
    }

    /// 用于日志输出的地址，密码被替换
    pub fn masked_url(&self) -> String {
        match self.amqp_url().ok().and_then(|u| Url::parse(&u).ok()) {
            Some(mut url) => {
                if url.password().is_some() {
                    let _ = url.set_password(Some("****"));
                }
                url.to_string()
            }
            None => format!("amqp://{}:{}", self.host, self.port),
        }
    }
}

fn encode_vhost(vhost: &str) -> String {
    vhost.replace('%', "%25").replace('/', "%2f")
}

impl ConfigValidator for BrokerConfig {
    fn validate(&self) -> ConfigResult<()> {
        ValidationUtils::validate_timeout_ms(
            self.connection_timeout_ms,
            "broker.connection_timeout_ms",
        )?;
        ValidationUtils::validate_timeout_ms(self.publish_timeout_ms, "broker.publish_timeout_ms")?;
        ValidationUtils::validate_count(self.channel_pool_size, "broker.channel_pool_size")?;

        if self.r#type == BrokerType::Rabbitmq {
            ValidationUtils::validate_port(self.port, "broker.port")?;
            ValidationUtils::validate_not_empty(&self.queue, "broker.queue")?;
            self.amqp_url()?;
        }

        Ok(())
    }
}
