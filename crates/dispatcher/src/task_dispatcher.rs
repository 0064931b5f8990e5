use std::sync::Arc;

use movie_backend_domain::{DispatchAcknowledgment, TaskBroker, TaskMessage, TaskSignature};
use movie_backend_errors::BackendError;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info, instrument, warn};

/// 任务投递器
///
/// 不维护任务注册表，任务名按字符串原样转发给代理。所有逐请求的代理错误都在这里
/// 转换为失败确认，不会向 HTTP 层传播。
#[derive(Clone)]
pub struct TaskDispatcher {
    broker: Arc<dyn TaskBroker>,
}

impl TaskDispatcher {
    pub fn new(broker: Arc<dyn TaskBroker>) -> Self {
        Self { broker }
    }

    pub fn broker(&self) -> &Arc<dyn TaskBroker> {
        &self.broker
    }

    /// 投递带类型的任务
    pub async fn dispatch_task<T: TaskSignature>(&self, task: &T) -> DispatchAcknowledgment {
        self.publish(task.to_message()).await
    }

    /// 按任务名投递，只带位置参数
    pub async fn dispatch<A>(&self, task_name: &str, args: &A) -> DispatchAcknowledgment
    where
        A: Serialize + ?Sized,
    {
        self.send_task(task_name, args, &Map::<String, Value>::new())
            .await
    }

    /// 按任务名投递，带位置参数和关键字参数
    pub async fn send_task<A, K>(&self, task_name: &str, args: &A, kwargs: &K) -> DispatchAcknowledgment
    where
        A: Serialize + ?Sized,
        K: Serialize + ?Sized,
    {
        match TaskMessage::from_serializable(task_name, args, kwargs) {
            Ok(message) => self.publish(message).await,
            Err(e) => {
                warn!(task_name, "任务参数序列化失败: {e}");
                DispatchAcknowledgment::failure(&e)
            }
        }
    }

    /// 发布在独立的 tokio 任务中执行，调用方被取消时已开始的发布仍会完成
    #[instrument(
        name = "dispatch",
        skip_all,
        fields(task_name = %message.task_name, task_id = %message.id, broker = self.broker.kind())
    )]
    async fn publish(&self, message: TaskMessage) -> DispatchAcknowledgment {
        let broker = Arc::clone(&self.broker);
        let handle = tokio::spawn(async move { broker.publish(message).await });

        match handle.await {
            Ok(Ok(task_id)) => {
                info!("任务已投递到消息代理");
                DispatchAcknowledgment::success(task_id)
            }
            Ok(Err(e)) => {
                error!("任务投递失败: {e}");
                DispatchAcknowledgment::failure(&e)
            }
            Err(join_error) => {
                error!("任务投递异常终止: {join_error}");
                DispatchAcknowledgment::failure(&BackendError::internal(join_error.to_string()))
            }
        }
    }
}
