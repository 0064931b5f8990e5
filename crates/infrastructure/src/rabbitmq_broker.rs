use async_trait::async_trait;
use lapin::{
    options::*,
    publisher_confirm::Confirmation,
    types::{AMQPValue, FieldArray, FieldTable},
    BasicProperties, Channel, Connection, ConnectionProperties, ConnectionStatus,
};
use movie_backend_config::BrokerConfig;
use movie_backend_domain::{BrokerHealth, TaskBroker, TaskId, TaskMessage};
use movie_backend_errors::{BackendError, BackendResult};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::channel_pool::{ChannelPool, PoolStats, PooledChannel};
use crate::envelope::{default_origin, encode_envelope, TaskEnvelope};

/// RabbitMQ 任务代理
///
/// 首次发布时建立连接，连接断开后在下一次发布时重连。发布使用 publisher
/// confirm，代理 ack 之后才视为成功；整个发布过程受 `publish_timeout_ms` 约束。
pub struct RabbitMqBroker {
    config: BrokerConfig,
    url: String,
    origin: String,
    connection: Mutex<Option<Connection>>,
    // 连接状态的共享句柄，健康检查不必等待连接锁
    status: std::sync::Mutex<Option<ConnectionStatus>>,
    pool: Arc<ChannelPool>,
    // 每个新连接都要重新声明一次队列
    queue_declared: AtomicBool,
}

impl RabbitMqBroker {
    /// 创建代理实例，不建立连接
    pub fn new(config: BrokerConfig) -> BackendResult<Self> {
        let url = config
            .amqp_url()
            .map_err(|e| BackendError::config_error(format!("无效的RabbitMQ地址: {e}")))?;
        let pool = Arc::new(ChannelPool::new(config.channel_pool_size));

        Ok(Self {
            config,
            url,
            origin: default_origin(),
            connection: Mutex::new(None),
            status: std::sync::Mutex::new(None),
            pool,
            queue_declared: AtomicBool::new(false),
        })
    }

    /// 立即建立连接
    pub async fn connect(&self) -> BackendResult<()> {
        let mut connection = self.connection.lock().await;
        self.ensure_connected(&mut connection).await?;
        Ok(())
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    async fn ensure_connected<'a>(
        &self,
        slot: &'a mut Option<Connection>,
    ) -> BackendResult<&'a Connection> {
        let reconnect = slot.as_ref().map_or(true, |c| !c.status().connected());
        if reconnect {
            if slot.is_some() {
                warn!("RabbitMQ连接已断开，重新连接");
                self.pool.clear();
            }
            self.queue_declared.store(false, Ordering::Release);

            let connection = self.establish_connection().await?;
            self.set_status(Some(connection.status().clone()));
            *slot = Some(connection);
        }

        slot.as_ref()
            .ok_or_else(|| BackendError::internal("RabbitMQ连接未初始化"))
    }

    fn set_status(&self, status: Option<ConnectionStatus>) {
        if let Ok(mut current) = self.status.lock() {
            *current = status;
        }
    }

    async fn establish_connection(&self) -> BackendResult<Connection> {
        let timeout_ms = self.config.connection_timeout_ms;
        let connection = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            Connection::connect(&self.url, ConnectionProperties::default()),
        )
        .await
        .map_err(|_| BackendError::broker_unavailable(format!("连接RabbitMQ超时: {timeout_ms}ms")))?
        .map_err(|e| BackendError::broker_unavailable(format!("连接RabbitMQ失败: {e}")))?;

        info!("成功连接到RabbitMQ: {}", self.config.masked_url());
        Ok(connection)
    }

    /// 创建开启 publisher confirm 的新通道
    async fn open_channel(&self) -> BackendResult<Channel> {
        let mut slot = self.connection.lock().await;
        let connection = self.ensure_connected(&mut slot).await?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| BackendError::broker_unavailable(format!("创建通道失败: {e}")))?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| BackendError::broker_unavailable(format!("开启发布确认失败: {e}")))?;

        debug!("创建新的AMQP通道: {}", channel.id());
        Ok(channel)
    }

    /// 使用默认交换机时声明目标队列，参数与 Celery 默认队列一致
    async fn declare_queue(&self, channel: &Channel) -> BackendResult<()> {
        if !self.config.exchange.is_empty() {
            return Ok(());
        }

        if self.queue_declared.load(Ordering::Acquire) {
            return Ok(());
        }

        // 声明是幂等的，并发发布重复声明无害
        let queue = self.config.queue.as_str();
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    exclusive: false,
                    auto_delete: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BackendError::broker_unavailable(format!("声明队列 {queue} 失败: {e}")))?;
        self.queue_declared.store(true, Ordering::Release);
        debug!("队列 {} 声明成功", queue);

        Ok(())
    }

    async fn publish_once(&self, message: &TaskMessage) -> BackendResult<()> {
        let envelope = encode_envelope(message, &self.origin)?;
        let properties = amqp_properties(&envelope)?;

        let permit = self
            .pool
            .reserve()
            .await
            .ok_or_else(|| BackendError::internal("通道池已关闭"))?;
        let channel = match self.pool.take_idle() {
            Some(channel) => channel,
            None => self.open_channel().await?,
        };
        let mut lease = PooledChannel::new(channel, Arc::clone(&self.pool), permit);
        let channel = lease
            .channel()
            .ok_or_else(|| BackendError::internal("通道已被回收"))?;

        self.declare_queue(channel).await?;

        let confirm = channel
            .basic_publish(
                self.config.exchange.as_str(),
                self.config.queue.as_str(),
                BasicPublishOptions::default(),
                &envelope.body,
                properties,
            )
            .await
            .map_err(|e| {
                BackendError::broker_unavailable(format!(
                    "发布消息到队列 {} 失败: {e}",
                    self.config.queue
                ))
            })?;

        // 等待确认
        let confirmation = confirm
            .await
            .map_err(|e| BackendError::broker_unavailable(format!("消息发布确认失败: {e}")))?;
        if let Confirmation::Nack(_) = confirmation {
            return Err(BackendError::broker_unavailable("消息被代理拒绝"));
        }

        lease.mark_healthy();
        Ok(())
    }
}

#[async_trait]
impl TaskBroker for RabbitMqBroker {
    async fn publish(&self, message: TaskMessage) -> BackendResult<TaskId> {
        message.ensure_publishable()?;

        let timeout_ms = self.config.publish_timeout_ms;
        match tokio::time::timeout(Duration::from_millis(timeout_ms), self.publish_once(&message))
            .await
        {
            Ok(Ok(())) => {
                debug!(
                    task_id = %message.id,
                    "消息已发布到队列: {}",
                    self.config.queue
                );
                Ok(message.id)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(BackendError::PublishTimeout { timeout_ms }),
        }
    }

    async fn health(&self) -> BrokerHealth {
        let connected = match self.status.lock() {
            Ok(status) => status.as_ref().map(ConnectionStatus::connected),
            Err(_) => Some(false),
        };

        match connected {
            Some(true) => BrokerHealth::connected(self.kind()),
            Some(false) => BrokerHealth::disconnected(self.kind(), "连接已断开"),
            None => BrokerHealth::disconnected(self.kind(), "尚未建立连接"),
        }
    }

    async fn close(&self) -> BackendResult<()> {
        let connection = self.connection.lock().await.take();
        self.set_status(None);
        self.queue_declared.store(false, Ordering::Release);
        self.pool.clear();

        if let Some(connection) = connection {
            if connection.status().connected() {
                connection
                    .close(200, "正常关闭")
                    .await
                    .map_err(|e| BackendError::broker_unavailable(format!("关闭连接失败: {e}")))?;
            }
            info!("RabbitMQ连接已关闭");
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "rabbitmq"
    }
}

fn amqp_properties(envelope: &TaskEnvelope) -> BackendResult<BasicProperties> {
    Ok(BasicProperties::default()
        .with_content_type(envelope.content_type.into())
        .with_content_encoding(envelope.content_encoding.into())
        .with_correlation_id(envelope.correlation_id.as_str().into())
        .with_delivery_mode(envelope.delivery_mode)
        .with_priority(envelope.priority)
        .with_headers(field_table(&envelope.headers_json()?)))
}

fn field_table(map: &Map<String, Value>) -> FieldTable {
    let mut table = FieldTable::default();
    for (key, value) in map {
        table.insert(key.as_str().into(), amqp_value(value));
    }
    table
}

fn amqp_value(value: &Value) -> AMQPValue {
    match value {
        Value::Null => AMQPValue::Void,
        Value::Bool(b) => AMQPValue::Boolean(*b),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => AMQPValue::LongLongInt(i),
            (None, Some(f)) => AMQPValue::Double(f),
            (None, None) => AMQPValue::LongString(n.to_string().as_str().into()),
        },
        Value::String(s) => AMQPValue::LongString(s.as_str().into()),
        Value::Array(items) => {
            AMQPValue::FieldArray(FieldArray::from(items.iter().map(amqp_value).collect::<Vec<_>>()))
        }
        Value::Object(map) => AMQPValue::FieldTable(field_table(map)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use movie_backend_config::BrokerType;
    use movie_backend_domain::{ExampleTask, TaskSignature};
    use serde_json::json;

    fn unreachable_config() -> BrokerConfig {
        BrokerConfig {
            r#type: BrokerType::Rabbitmq,
            host: "127.0.0.1".to_string(),
            // 没有服务监听的端口
            port: 1,
            connection_timeout_ms: 500,
            publish_timeout_ms: 1000,
            ..BrokerConfig::default()
        }
    }

    #[test]
    fn test_invalid_url_is_configuration_error() {
        let config = BrokerConfig {
            url: Some("http://not-amqp".to_string()),
            ..BrokerConfig::default()
        };
        match RabbitMqBroker::new(config) {
            Err(e) => assert!(e.is_fatal()),
            Ok(_) => panic!("Expected configuration error"),
        }
    }

    #[tokio::test]
    async fn test_new_does_not_connect() {
        let broker = RabbitMqBroker::new(unreachable_config()).unwrap();
        let health = broker.health().await;
        assert!(!health.connected);
        assert_eq!(health.kind, "rabbitmq");
    }

    #[tokio::test]
    async fn test_unreachable_broker_fails_without_hanging() {
        let broker = RabbitMqBroker::new(unreachable_config()).unwrap();
        let message = ExampleTask::hello_world().to_message();

        let err = broker.publish(message).await.unwrap_err();
        assert!(err.is_broker_failure(), "unexpected error: {err:?}");

        let stats = broker.pool_stats();
        assert_eq!(stats.in_use, 0);
        assert_eq!(stats.idle, 0);
    }

    /// 接受 TCP 连接但从不应答 AMQP 握手的监听端口
    async fn spawn_silent_listener() -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        port
    }

    #[tokio::test]
    async fn test_stalled_broker_hits_publish_timeout() {
        let config = BrokerConfig {
            r#type: BrokerType::Rabbitmq,
            host: "127.0.0.1".to_string(),
            port: spawn_silent_listener().await,
            connection_timeout_ms: 5000,
            publish_timeout_ms: 300,
            ..BrokerConfig::default()
        };
        let broker = RabbitMqBroker::new(config).unwrap();

        let started = std::time::Instant::now();
        let err = broker
            .publish(ExampleTask::hello_world().to_message())
            .await
            .unwrap_err();

        assert!(
            matches!(err, BackendError::PublishTimeout { timeout_ms: 300 }),
            "unexpected error: {err:?}"
        );
        assert!(err.is_broker_failure());
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(broker.pool_stats().in_use, 0);
    }

    #[tokio::test]
    async fn test_health_does_not_wait_for_connection_lock() {
        let broker = RabbitMqBroker::new(unreachable_config()).unwrap();
        let _guard = broker.connection.lock().await;

        let health = tokio::time::timeout(Duration::from_millis(200), broker.health())
            .await
            .unwrap();
        assert!(!health.connected);
        assert_eq!(health.detail.as_deref(), Some("尚未建立连接"));
    }

    #[tokio::test]
    async fn test_connection_attempt_resets_queue_declaration() {
        let broker = RabbitMqBroker::new(unreachable_config()).unwrap();
        broker.queue_declared.store(true, Ordering::Release);

        let err = broker
            .publish(ExampleTask::hello_world().to_message())
            .await
            .unwrap_err();
        assert!(err.is_broker_failure());
        assert!(!broker.queue_declared.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn test_close_resets_queue_declaration() {
        let broker = RabbitMqBroker::new(unreachable_config()).unwrap();
        broker.queue_declared.store(true, Ordering::Release);

        broker.close().await.unwrap();
        assert!(!broker.queue_declared.load(Ordering::Acquire));
        assert_eq!(broker.health().await.detail.as_deref(), Some("尚未建立连接"));
    }

    #[tokio::test]
    async fn test_empty_task_name_rejected_before_connecting() {
        let broker = RabbitMqBroker::new(unreachable_config()).unwrap();
        let message = TaskMessage::new("", vec![], Map::new());

        let err = broker.publish(message).await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidTaskName(_)));
    }

    #[test]
    fn test_amqp_value_conversion() {
        assert!(matches!(amqp_value(&Value::Null), AMQPValue::Void));
        assert!(matches!(amqp_value(&json!(true)), AMQPValue::Boolean(true)));
        assert!(matches!(amqp_value(&json!(7)), AMQPValue::LongLongInt(7)));
        assert!(matches!(amqp_value(&json!(1.5)), AMQPValue::Double(_)));
        assert!(matches!(amqp_value(&json!("x")), AMQPValue::LongString(_)));
        assert!(matches!(amqp_value(&json!([null, null])), AMQPValue::FieldArray(_)));
        assert!(matches!(amqp_value(&json!({"a": 1})), AMQPValue::FieldTable(_)));
    }

    #[test]
    fn test_properties_carry_task_headers() {
        let message = ExampleTask::hello_world().to_message();
        let envelope = encode_envelope(&message, "1@h").unwrap();
        let properties = amqp_properties(&envelope).unwrap();

        let headers = properties.headers().as_ref().unwrap();
        let keys: Vec<&str> = headers.inner().keys().map(|k| k.as_str()).collect();
        assert!(keys.contains(&"task"));
        assert!(keys.contains(&"id"));
        assert!(keys.contains(&"timelimit"));
        assert_eq!(properties.delivery_mode(), &Some(2));
    }
}
