use async_trait::async_trait;
use movie_backend_domain::{BrokerHealth, TaskBroker, TaskId, TaskMessage};
use movie_backend_errors::{BackendError, BackendResult};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::debug;

use crate::envelope::{default_origin, encode_envelope, TaskEnvelope};

/// 内存任务代理
///
/// 走与 RabbitMQ 相同的封包编码，但把封包留在进程内，适用于本地开发和测试。
/// 没有 worker 消费这些消息，超过容量后最早的封包被丢弃。
pub struct InMemoryBroker {
    envelopes: Mutex<VecDeque<TaskEnvelope>>,
    capacity: usize,
    available: AtomicBool,
    origin: String,
}

impl InMemoryBroker {
    /// 默认最多保留的封包数
    pub const DEFAULT_CAPACITY: usize = 10_000;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            envelopes: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity,
            available: AtomicBool::new(true),
            origin: default_origin(),
        }
    }

    /// 模拟代理掉线或恢复
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn published_envelopes(&self) -> Vec<TaskEnvelope> {
        self.envelopes
            .lock()
            .map(|envelopes| envelopes.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 解码所有已发布的封包
    pub fn published_messages(&self) -> BackendResult<Vec<TaskMessage>> {
        self.published_envelopes()
            .iter()
            .map(TaskEnvelope::decode)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.envelopes.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut envelopes) = self.envelopes.lock() {
            envelopes.clear();
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskBroker for InMemoryBroker {
    async fn publish(&self, message: TaskMessage) -> BackendResult<TaskId> {
        message.ensure_publishable()?;
        if !self.available.load(Ordering::SeqCst) {
            return Err(BackendError::broker_unavailable("内存代理不可用"));
        }

        let envelope = encode_envelope(&message, &self.origin)?;
        let mut envelopes = self
            .envelopes
            .lock()
            .map_err(|_| BackendError::internal("内存代理锁已损坏"))?;
        if envelopes.len() >= self.capacity {
            if let Some(dropped) = envelopes.pop_front() {
                debug!("内存代理已满，丢弃最早的任务: {}", dropped.correlation_id);
            }
        }
        envelopes.push_back(envelope);
        drop(envelopes);

        debug!(task_id = %message.id, "任务已写入内存代理: {}", message.task_name);
        Ok(message.id)
    }

    async fn health(&self) -> BrokerHealth {
        if self.available.load(Ordering::SeqCst) {
            BrokerHealth::connected(self.kind())
        } else {
            BrokerHealth::disconnected(self.kind(), "内存代理不可用")
        }
    }

    fn kind(&self) -> &'static str {
        "in_memory"
    }
}
