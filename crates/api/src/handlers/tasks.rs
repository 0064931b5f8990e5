use axum::{extract::State, Json};
use movie_backend_domain::ExampleTask;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::response::MessageResponse;
use crate::routes::AppState;

/// 投递演示任务，不需要请求体
///
/// 成功只代表消息已被代理接收。
pub async fn dispatch_example_task(State(state): State<AppState>) -> ApiResult<Json<MessageResponse>> {
    let ack = state
        .dispatcher
        .dispatch_task(&ExampleTask::hello_world())
        .await;

    if !ack.is_success() {
        return Err(ApiError::Dispatch(ack));
    }

    if let Some(task_id) = &ack.task_id {
        info!("演示任务已投递: {}", task_id);
    }
    Ok(Json(MessageResponse::new(ack.message)))
}
