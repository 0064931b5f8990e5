use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use movie_backend::{Application, ShutdownManager};
use movie_backend_config::{AppConfig, BrokerConfig};
use movie_backend_infrastructure::InMemoryBroker;
use movie_backend_testing_utils::RecordingBroker;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tower::ServiceExt;

fn in_memory_config() -> AppConfig {
    AppConfig {
        broker: BrokerConfig::in_memory_default(),
        ..AppConfig::default()
    }
}

fn app_with_in_memory_broker() -> (Application, Arc<InMemoryBroker>) {
    let broker = Arc::new(InMemoryBroker::new());
    let app = Application::with_broker(in_memory_config(), broker.clone()).unwrap();
    (app, broker)
}

async fn get(app: &Application, uri: &str) -> (StatusCode, Value) {
    let response = app
        .router()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_task_endpoint_enqueues_one_celery_message() {
    let (app, broker) = app_with_in_memory_broker();

    let (status, body) = get(&app, "/api/v1/task").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "success"}));

    let envelopes = broker.published_envelopes();
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].headers.task, "app.tasks.example_task");
    assert_eq!(envelopes[0].headers.argsrepr, r#"["Hello World"]"#);

    let messages = broker.published_messages().unwrap();
    assert_eq!(messages[0].args, vec![json!("Hello World")]);
}

#[tokio::test]
async fn test_task_endpoint_with_broker_down() {
    let (app, broker) = app_with_in_memory_broker();
    broker.set_available(false);

    let (status, body) = get(&app, "/api/v1/task").await;
    assert!(status.is_server_error());
    assert!(body["error"]["message"].is_string());
    assert!(broker.is_empty());

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_hundred_concurrent_requests() {
    let (app, broker) = app_with_in_memory_broker();

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let router = app.router();
            tokio::spawn(async move {
                router
                    .oneshot(Request::builder().uri("/api/v1/task").body(Body::empty()).unwrap())
                    .await
                    .unwrap()
                    .status()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let messages = broker.published_messages().unwrap();
    assert_eq!(messages.len(), 100);
    let ids: HashSet<_> = messages.iter().map(|m| m.id).collect();
    assert_eq!(ids.len(), 100);
    assert!(messages
        .iter()
        .all(|m| m.task_name == "app.tasks.example_task" && m.args == vec![json!("Hello World")]));
}

#[tokio::test]
async fn test_application_new_with_in_memory_broker() {
    let app = Application::new(in_memory_config()).await.unwrap();
    assert_eq!(app.broker().kind(), "in_memory");

    let (status, body) = get(&app, "/api/v1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Hello World");
}

#[tokio::test]
async fn test_application_new_rejects_invalid_broker_url() {
    let mut config = in_memory_config();
    config.broker = BrokerConfig {
        url: Some("not a url".to_string()),
        ..BrokerConfig::default()
    };

    assert!(Application::new(config).await.is_err());
}

#[tokio::test]
async fn test_serve_until_shutdown() {
    let (app, broker) = app_with_in_memory_broker();
    let app = Arc::new(app);
    let shutdown = ShutdownManager::new();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    shutdown.register_broker(Arc::clone(app.broker()));
    let signal = shutdown.signal();
    let server = {
        let app = Arc::clone(&app);
        tokio::spawn(async move { app.serve(listener, signal).await })
    };

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /api/v1/task HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(r#"{"message":"success"}"#));
    assert_eq!(broker.len(), 1);

    shutdown.trigger();
    let result = tokio::time::timeout(std::time::Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_shutdown_closes_broker_after_server_stops() {
    let broker = RecordingBroker::new();
    let app = Arc::new(Application::with_broker(in_memory_config(), Arc::new(broker.clone())).unwrap());
    let shutdown = ShutdownManager::new();
    shutdown.register_broker(Arc::clone(app.broker()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let signal = shutdown.signal();
    let server = {
        let app = Arc::clone(&app);
        tokio::spawn(async move { app.serve(listener, signal).await })
    };

    shutdown.trigger();
    tokio::time::timeout(std::time::Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(broker.close_count(), 0);

    shutdown.close_brokers().await;
    assert_eq!(broker.close_count(), 1);
}
