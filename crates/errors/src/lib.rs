use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("消息代理不可用: {0}")]
    BrokerUnavailable(String),
    #[error("消息发布超时: {timeout_ms}ms")]
    PublishTimeout { timeout_ms: u64 },
    #[error("无效的任务名称: {0:?}")]
    InvalidTaskName(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("上游服务错误: {0}")]
    Upstream(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

impl BackendError {
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::Serialization(msg.into())
    }
    pub fn broker_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::BrokerUnavailable(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn upstream<S: Into<String>>(msg: S) -> Self {
        Self::Upstream(msg.into())
    }
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
    /// 配置错误只应出现在进程初始化阶段
    pub fn is_fatal(&self) -> bool {
        matches!(self, BackendError::Configuration(_))
    }
    pub fn is_broker_failure(&self) -> bool {
        matches!(
            self,
            BackendError::BrokerUnavailable(_) | BackendError::PublishTimeout { .. }
        )
    }
    /// 返回给HTTP调用方的通用描述，不包含连接串等内部细节
    pub fn user_message(&self) -> &'static str {
        match self {
            BackendError::Serialization(_) => "任务参数无法序列化",
            BackendError::BrokerUnavailable(_) => "任务队列暂时不可用，请稍后重试",
            BackendError::PublishTimeout { .. } => "任务投递超时，请稍后重试",
            BackendError::InvalidTaskName(_) => "任务名称无效",
            BackendError::Upstream(_) => "外部服务暂时不可用",
            _ => "系统繁忙，请稍后重试",
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Serialization(err.to_string())
    }
}
