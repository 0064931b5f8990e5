use axum::{
    extract::{Query, State},
    Json,
};
use movie_backend_domain::MovieSummary;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct MovieQuery {
    pub title: Option<String>,
}

/// 按片名搜索电影
pub async fn search_movies(
    State(state): State<AppState>,
    Query(query): Query<MovieQuery>,
) -> ApiResult<Json<Vec<MovieSummary>>> {
    let title = query
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("缺少查询参数 title".to_string()))?;

    let movies = state.movies.search(&title).await?;
    Ok(Json(movies))
}
