use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use movie_backend_api::{create_app, routes::AppState};
use movie_backend_config::AppConfig;
use movie_backend_dispatcher::TaskDispatcher;
use movie_backend_domain::TaskBroker;
use movie_backend_infrastructure::{BrokerFactory, OmdbClient};
use tokio::net::TcpListener;
use tracing::info;

use crate::shutdown::ShutdownSignal;

/// 主应用程序
///
/// 代理客户端在这里显式创建并注入到 HTTP 层，连接的关闭由
/// [`crate::ShutdownManager`] 在服务排空后统一处理。
pub struct Application {
    config: AppConfig,
    broker: Arc<dyn TaskBroker>,
    router: Router,
}

impl Application {
    /// 创建新的应用实例
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("初始化应用程序，环境: {}", config.environment);

        let broker = BrokerFactory::create(&config.broker)
            .await
            .context("创建任务代理失败")?;

        Self::with_broker(config, broker)
    }

    /// 使用已创建的代理组装应用
    pub fn with_broker(config: AppConfig, broker: Arc<dyn TaskBroker>) -> Result<Self> {
        let dispatcher = TaskDispatcher::new(Arc::clone(&broker));
        let movies = OmdbClient::new(&config.omdb).context("创建OMDB客户端失败")?;

        let state = AppState::new(dispatcher, Arc::new(movies));
        let router = create_app(state, &config.server);

        Ok(Self {
            config,
            broker,
            router,
        })
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn broker(&self) -> &Arc<dyn TaskBroker> {
        &self.broker
    }

    /// 绑定配置的地址并运行，直到收到关闭信号
    pub async fn run(&self, shutdown: ShutdownSignal) -> Result<()> {
        let bind_address = self.config.server.bind_address();
        let listener = TcpListener::bind(&bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {bind_address}"))?;

        self.serve(listener, shutdown).await
    }

    /// 在给定监听器上提供服务，收到信号后等待进行中的请求完成
    pub async fn serve(&self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<()> {
        let local_addr = listener.local_addr().context("获取监听地址失败")?;
        info!("API服务器启动在 http://{}", local_addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.wait().await;
                info!("API服务器收到关闭信号");
            })
            .await
            .context("API服务器运行失败")?;

        info!("API服务器已停止");
        Ok(())
    }
}
