use axum::{routing::get, Router};
use movie_backend_dispatcher::TaskDispatcher;
use movie_backend_domain::MovieSearch;
use std::sync::Arc;

use crate::handlers::{
    health::health_check,
    movies::search_movies,
    root::root_handler,
    tasks::dispatch_example_task,
};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<TaskDispatcher>,
    pub movies: Arc<dyn MovieSearch>,
}

impl AppState {
    pub fn new(dispatcher: TaskDispatcher, movies: Arc<dyn MovieSearch>) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            movies,
        }
    }
}

/// 创建API路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // 健康检查
        .route("/health", get(health_check))
        .route("/api/v1", get(root_handler))
        // 异步任务投递
        .route(
            "/api/v1/task",
            get(dispatch_example_task).post(dispatch_example_task),
        )
        // OMDB 电影搜索
        .route("/api/v1/omdb/movies", get(search_movies))
        .route("/api/v1/omdb/movies/", get(search_movies))
        .with_state(state)
}
