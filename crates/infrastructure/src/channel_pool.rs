use lapin::Channel;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// AMQP 通道池
///
/// 信号量限制同时在用的通道数，空闲通道放在队列中复用。
pub struct ChannelPool {
    idle: Mutex<VecDeque<Channel>>,
    permits: Arc<Semaphore>,
    max_size: usize,
}

impl ChannelPool {
    pub fn new(max_size: usize) -> Self {
        Self {
            idle: Mutex::new(VecDeque::with_capacity(max_size)),
            permits: Arc::new(Semaphore::new(max_size)),
            max_size,
        }
    }

    /// 等待一个可用名额
    pub async fn reserve(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.permits).acquire_owned().await.ok()
    }

    /// 取出一个仍然打开的空闲通道
    pub fn take_idle(&self) -> Option<Channel> {
        let mut idle = self.idle.lock().ok()?;
        while let Some(channel) = idle.pop_front() {
            if channel.status().connected() {
                return Some(channel);
            }
            debug!("丢弃已关闭的空闲通道: {}", channel.id());
        }
        None
    }

    fn release(&self, channel: Channel) {
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < self.max_size {
                idle.push_back(channel);
                return;
            }
        }
        discard(channel);
    }

    /// 连接重建后旧通道全部失效
    pub fn clear(&self) {
        if let Ok(mut idle) = self.idle.lock() {
            idle.clear();
        }
    }

    pub fn stats(&self) -> PoolStats {
        let idle = self.idle.lock().map(|i| i.len()).unwrap_or(0);
        PoolStats {
            idle,
            in_use: self.max_size - self.permits.available_permits(),
            max_size: self.max_size,
        }
    }
}

/// 通道池统计信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub idle: usize,
    pub in_use: usize,
    pub max_size: usize,
}

/// RAII守卫，归还名额并按发布结果决定通道去留
///
/// 只有调用过 [`PooledChannel::mark_healthy`] 的通道才会放回池中，发布失败、
/// 超时或调用方被取消时通道会被关闭。
pub struct PooledChannel {
    channel: Option<Channel>,
    pool: Arc<ChannelPool>,
    healthy: bool,
    _permit: OwnedSemaphorePermit,
}

impl PooledChannel {
    pub fn new(channel: Channel, pool: Arc<ChannelPool>, permit: OwnedSemaphorePermit) -> Self {
        Self {
            channel: Some(channel),
            pool,
            healthy: false,
            _permit: permit,
        }
    }

    pub fn channel(&self) -> Option<&Channel> {
        self.channel.as_ref()
    }

    pub fn mark_healthy(&mut self) {
        self.healthy = true;
    }
}

impl Drop for PooledChannel {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.take() {
            if self.healthy && channel.status().connected() {
                self.pool.release(channel);
            } else {
                discard(channel);
            }
        }
    }
}

fn discard(channel: Channel) {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn(async move {
            let _ = channel.close(200, "discarded").await;
        });
    }
}
