use async_trait::async_trait;
use movie_backend_errors::BackendResult;
use serde::{Deserialize, Serialize};

use crate::task::{TaskId, TaskMessage};

/// 消息代理客户端接口
///
/// 发布失败不做自动重试，错误同步返回给调用方。代理到 worker 的投递语义
/// （至少一次）由代理自身保证，不在此接口的控制范围内。
#[async_trait]
pub trait TaskBroker: Send + Sync {
    /// 发布一条任务消息，成功时返回任务ID
    async fn publish(&self, message: TaskMessage) -> BackendResult<TaskId>;

    /// 连接状态，用于健康检查
    async fn health(&self) -> BrokerHealth;

    /// 关闭底层连接
    async fn close(&self) -> BackendResult<()> {
        Ok(())
    }

    fn kind(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerHealth {
    pub kind: String,
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl BrokerHealth {
    pub fn connected(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            connected: true,
            detail: None,
        }
    }

    pub fn disconnected(kind: &str, detail: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            connected: false,
            detail: Some(detail.into()),
        }
    }
}
