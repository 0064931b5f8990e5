use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use movie_backend::{Application, ShutdownManager};
use movie_backend_config::{AppConfig, LogConfig, LogLevel, OutputFormat};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let matches = Command::new("movie-backend")
        .version(env!("CARGO_PKG_VERSION"))
        .about("电影搜索与异步任务投递后端服务")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径，未指定时依次查找 config/movie-backend.toml 和 movie-backend.toml"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("监听地址"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("监听端口")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty"]),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config");

    // 加载配置，命令行参数优先
    let mut config = AppConfig::load(config_path.map(String::as_str))
        .with_context(|| match config_path {
            Some(path) => format!("加载配置文件失败: {path}"),
            None => "加载配置失败".to_string(),
        })?;

    if let Some(host) = matches.get_one::<String>("host") {
        config.server.host = host.clone();
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }
    if let Some(level) = matches.get_one::<String>("log-level") {
        config.logging.level = level.parse::<LogLevel>().map_err(anyhow::Error::msg)?;
    }
    if let Some(format) = matches.get_one::<String>("log-format") {
        config.logging.format = format.parse::<OutputFormat>().map_err(anyhow::Error::msg)?;
    }

    // 初始化日志系统
    init_logging(&config.logging)?;

    info!("启动电影后端服务");
    info!("监听地址: {}", config.server.bind_address());
    info!("任务代理: {:?} {}", config.broker.r#type, config.broker.masked_url());

    // 创建应用实例，代理地址无效时在这里失败
    let app = Arc::new(Application::new(config).await?);

    // 关闭时由管理器断开代理连接
    let shutdown_manager = ShutdownManager::new();
    shutdown_manager.register_broker(Arc::clone(app.broker()));

    // 启动应用
    let mut app_handle = {
        let shutdown = shutdown_manager.signal();
        let app = Arc::clone(&app);

        tokio::spawn(async move { app.run(shutdown).await })
    };

    // 等待关闭信号，或服务自行退出
    let exited = tokio::select! {
        _ = wait_for_shutdown_signal() => None,
        result = &mut app_handle => Some(result),
    };

    let outcome = match exited {
        Some(Ok(Ok(()))) => Ok(()),
        Some(Ok(Err(e))) => {
            error!("应用运行失败: {e:#}");
            Err(e)
        }
        Some(Err(e)) => Err(anyhow::anyhow!("应用任务异常退出: {e}")),
        None => {
            info!("收到关闭信号，开始优雅关闭...");
            shutdown_manager.trigger();

            // 等待应用关闭，设置超时
            match tokio::time::timeout(Duration::from_secs(30), app_handle).await {
                Ok(Ok(Ok(()))) => info!("应用已优雅关闭"),
                Ok(Ok(Err(e))) => error!("应用关闭时发生错误: {e:#}"),
                Ok(Err(e)) => error!("应用任务异常退出: {e}"),
                Err(_) => warn!("应用关闭超时，强制退出"),
            }
            Ok(())
        }
    };

    shutdown_manager.close_brokers().await;

    info!("电影后端服务已退出");
    outcome
}

/// 初始化日志系统，RUST_LOG 优先于配置的级别
fn init_logging(logging: &LogConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.to_string()));

    let registry = tracing_subscriber::registry().with(env_filter);

    match logging.format {
        OutputFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        OutputFormat::Pretty => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
    }

    Ok(())
}

/// 等待关闭信号
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("安装Ctrl+C信号处理器失败: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("安装SIGTERM信号处理器失败: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}
