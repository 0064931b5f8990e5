use axum::Json;

use crate::response::MessageResponse;

/// 根路径处理器
pub async fn root_handler() -> Json<MessageResponse> {
    Json(MessageResponse::new("Hello World"))
}
