use movie_backend_errors::BackendError;
use serde::{Deserialize, Serialize};

use crate::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    Success,
    Failure,
}

/// 投递失败的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// 参数无法编码，重试无意义
    Serialization,
    /// 连接被拒绝、代理不可用或发布超时
    BrokerUnavailable,
    InvalidTask,
    Internal,
}

impl From<&BackendError> for FailureReason {
    fn from(err: &BackendError) -> Self {
        match err {
            BackendError::Serialization(_) => FailureReason::Serialization,
            BackendError::BrokerUnavailable(_) | BackendError::PublishTimeout { .. } => {
                FailureReason::BrokerUnavailable
            }
            BackendError::InvalidTaskName(_) => FailureReason::InvalidTask,
            _ => FailureReason::Internal,
        }
    }
}

/// 投递确认
///
/// 只表示消息已交给代理，不代表任务已经执行完成。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchAcknowledgment {
    pub status: DispatchStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
}

impl DispatchAcknowledgment {
    pub fn success(task_id: TaskId) -> Self {
        Self {
            status: DispatchStatus::Success,
            message: "success".to_string(),
            task_id: Some(task_id),
            reason: None,
        }
    }

    pub fn failure(err: &BackendError) -> Self {
        Self {
            status: DispatchStatus::Failure,
            message: err.user_message().to_string(),
            task_id: None,
            reason: Some(FailureReason::from(err)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DispatchStatus::Success
    }
}
