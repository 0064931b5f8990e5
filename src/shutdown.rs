use std::sync::{Arc, Mutex};
use std::time::Duration;

use movie_backend_domain::TaskBroker;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// 单个代理关闭连接的最长等待时间
const BROKER_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// 进程级关闭协调
///
/// 负责两件事：向 HTTP 服务广播停止信号，以及在服务排空后关闭登记过的
/// 代理连接。克隆出的实例共享同一状态。
#[derive(Clone)]
pub struct ShutdownManager {
    signal: Arc<watch::Sender<bool>>,
    brokers: Arc<Mutex<Vec<Arc<dyn TaskBroker>>>>,
}

/// 关闭信号的接收端
pub struct ShutdownSignal(watch::Receiver<bool>);

impl ShutdownSignal {
    /// 等待关闭信号，管理器被释放时同样返回
    pub async fn wait(mut self) {
        let _ = self.0.wait_for(|stopping| *stopping).await;
    }
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            signal: Arc::new(signal),
            brokers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 登记需要在退出时关闭的代理
    pub fn register_broker(&self, broker: Arc<dyn TaskBroker>) {
        if let Ok(mut brokers) = self.brokers.lock() {
            debug!("登记任务代理: {}", broker.kind());
            brokers.push(broker);
        }
    }

    /// 订阅关闭信号，触发之后订阅的接收端立即返回
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal(self.signal.subscribe())
    }

    /// 通知所有订阅者停止接收新请求，重复调用无副作用
    pub fn trigger(&self) {
        if self.signal.send_replace(true) {
            debug!("关闭信号已经发出过");
            return;
        }
        info!("触发服务关闭，通知 {} 个订阅者", self.signal.receiver_count());
    }

    /// 关闭所有登记的代理，每个代理只关闭一次
    pub async fn close_brokers(&self) {
        let brokers = match self.brokers.lock() {
            Ok(mut brokers) => std::mem::take(&mut *brokers),
            Err(_) => return,
        };

        for broker in brokers {
            match tokio::time::timeout(BROKER_CLOSE_TIMEOUT, broker.close()).await {
                Ok(Ok(())) => info!("任务代理已关闭: {}", broker.kind()),
                Ok(Err(e)) => error!("关闭任务代理失败: {}: {}", broker.kind(), e),
                Err(_) => warn!("关闭任务代理超时: {}", broker.kind()),
            }
        }
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}
