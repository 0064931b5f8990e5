use async_trait::async_trait;
use movie_backend_config::OmdbConfig;
use movie_backend_domain::{MovieSearch, MovieSummary};
use movie_backend_errors::{BackendError, BackendResult};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// OMDB 对"查无结果"的固定答复
const MOVIE_NOT_FOUND: &str = "Movie not found!";

#[derive(Debug, Deserialize)]
struct OmdbSearchResponse {
    #[serde(rename = "Search")]
    search: Option<Vec<MovieSummary>>,
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

/// OMDB 搜索接口的 HTTP 客户端
pub struct OmdbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OmdbClient {
    pub fn new(config: &OmdbConfig) -> BackendResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| BackendError::config_error(format!("创建OMDB客户端失败: {e}")))?;

        if config.api_key.is_empty() {
            warn!("未配置OMDB API Key，电影搜索请求将被OMDB拒绝");
        }

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl MovieSearch for OmdbClient {
    async fn search(&self, title: &str) -> BackendResult<Vec<MovieSummary>> {
        debug!("查询OMDB: {}", title);

        let response = self
            .http
            .get(&self.base_url)
            .query(&[("apikey", self.api_key.as_str()), ("s", title)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| BackendError::upstream(format!("OMDB请求失败: {}", e.without_url())))?;

        let body: OmdbSearchResponse = response
            .json()
            .await
            .map_err(|e| {
                BackendError::upstream(format!("OMDB响应解析失败: {}", e.without_url()))
            })?;

        match body {
            OmdbSearchResponse {
                search: Some(movies),
                ..
            } => Ok(movies),
            OmdbSearchResponse {
                error: Some(error), ..
            } if error == MOVIE_NOT_FOUND => Ok(Vec::new()),
            OmdbSearchResponse {
                response, error, ..
            } => Err(BackendError::upstream(format!(
                "OMDB返回错误: Response={}, Error={}",
                response.as_deref().unwrap_or("-"),
                error.as_deref().unwrap_or("-")
            ))),
        }
    }
}
