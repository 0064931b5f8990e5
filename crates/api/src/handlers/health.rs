use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::routes::AppState;

/// 健康检查
///
/// 代理断开时状态为 `degraded`，HTTP 状态码仍为 200。
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let broker = state.dispatcher.broker().health().await;
    let status = if broker.connected { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "broker": broker,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "movie-backend",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
