//! # Movie Backend API
//!
//! 电影后端的 REST 接口层，基于 Axum 构建。
//!
//! ## API 端点
//!
//! - `GET /health` - 健康检查，附带任务代理连接状态
//! - `GET /api/v1` - 欢迎信息
//! - `GET|POST /api/v1/task` - 投递演示任务 `app.tasks.example_task("Hello World")`
//! - `GET /api/v1/omdb/movies/?title=<t>` - 通过 OMDB 搜索电影
//!
//! 任务接口只返回"已交给代理"的确认，不等待任务执行结果。该接口没有任何认证。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use movie_backend_api::{create_app, routes::AppState};
//!
//! let state = AppState::new(dispatcher, movies);
//! let app = create_app(state, &config.server);
//! axum::serve(listener, app).await?;
//! ```

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

use axum::Router;
use movie_backend_config::ServerConfig;
use tower::ServiceBuilder;

use middleware::{cors_layer, request_logging, timeout_layer, trace_layer};
use routes::{create_routes, AppState};

pub use error::{ApiError, ApiResult};

/// 创建完整的API应用
pub fn create_app(state: AppState, server: &ServerConfig) -> Router {
    create_routes(state).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(cors_layer(&server.cors_origins))
            .layer(axum::middleware::from_fn(request_logging))
            .layer(timeout_layer(server.request_timeout_seconds)),
    )
}
