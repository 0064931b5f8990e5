use std::sync::Arc;
use tracing::{debug, info, warn};

use movie_backend_config::{BrokerConfig, BrokerType};
use movie_backend_domain::TaskBroker;
use movie_backend_errors::BackendResult;

use crate::{InMemoryBroker, RabbitMqBroker};

pub struct BrokerFactory;

impl BrokerFactory {
    /// 按配置创建任务代理
    ///
    /// RabbitMQ 会尝试立即连接一次，失败只记录警告，之后每次发布时重新尝试连接。
    /// 地址无效属于配置错误，直接返回。
    pub async fn create(config: &BrokerConfig) -> BackendResult<Arc<dyn TaskBroker>> {
        debug!("Creating task broker with type: {:?}", config.r#type);

        match config.r#type {
            BrokerType::Rabbitmq => {
                info!("Initializing RabbitMQ broker: {}", config.masked_url());
                let broker = RabbitMqBroker::new(config.clone())?;
                if let Err(e) = broker.connect().await {
                    warn!("启动时无法连接RabbitMQ，将在发布时重试: {}", e);
                }
                Ok(Arc::new(broker))
            }
            BrokerType::InMemory => {
                info!("Initializing in-memory broker");
                Ok(Arc::new(InMemoryBroker::new()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_in_memory_broker() {
        let broker = BrokerFactory::create(&BrokerConfig::in_memory_default())
            .await
            .unwrap();
        assert_eq!(broker.kind(), "in_memory");
        assert!(broker.health().await.connected);
    }

    #[tokio::test]
    async fn test_create_rabbitmq_broker_while_unreachable() {
        let config = BrokerConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connection_timeout_ms: 500,
            ..BrokerConfig::default()
        };

        let broker = BrokerFactory::create(&config).await.unwrap();
        assert_eq!(broker.kind(), "rabbitmq");
        assert!(!broker.health().await.connected);
    }

    #[tokio::test]
    async fn test_invalid_url_is_fatal() {
        let config = BrokerConfig {
            url: Some("redis://localhost:6379".to_string()),
            ..BrokerConfig::default()
        };

        match BrokerFactory::create(&config).await {
            Err(e) => assert!(e.is_fatal()),
            Ok(_) => panic!("Expected configuration error"),
        }
    }
}
