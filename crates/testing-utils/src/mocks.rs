//! In-memory doubles for the broker and movie search ports

use async_trait::async_trait;
use movie_backend_domain::{
    BrokerHealth, MovieSearch, MovieSummary, TaskBroker, TaskId, TaskMessage,
};
use movie_backend_errors::{BackendError, BackendResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Broker that accepts every message and keeps it for inspection
#[derive(Debug, Clone, Default)]
pub struct RecordingBroker {
    published: Arc<Mutex<Vec<TaskMessage>>>,
    closes: Arc<AtomicUsize>,
}

impl RecordingBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<TaskMessage> {
        self.published.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskBroker for RecordingBroker {
    async fn publish(&self, message: TaskMessage) -> BackendResult<TaskId> {
        message.ensure_publishable()?;
        let id = message.id;
        self.published.lock().unwrap().push(message);
        Ok(id)
    }

    async fn health(&self) -> BrokerHealth {
        BrokerHealth::connected(self.kind())
    }

    async fn close(&self) -> BackendResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "recording"
    }
}

type ErrorFactory = dyn Fn() -> BackendError + Send + Sync;

/// Broker whose every publish fails with the error produced by `make_error`
pub struct FailingBroker {
    make_error: Box<ErrorFactory>,
    attempts: AtomicUsize,
}

impl FailingBroker {
    pub fn new<F>(make_error: F) -> Self
    where
        F: Fn() -> BackendError + Send + Sync + 'static,
    {
        Self {
            make_error: Box::new(make_error),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self::new(|| BackendError::broker_unavailable("Connection refused (os error 111)"))
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskBroker for FailingBroker {
    async fn publish(&self, _message: TaskMessage) -> BackendResult<TaskId> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err((self.make_error)())
    }

    async fn health(&self) -> BrokerHealth {
        BrokerHealth::disconnected(self.kind(), "broker is down")
    }

    async fn close(&self) -> BackendResult<()> {
        Err(BackendError::broker_unavailable("broker is down"))
    }

    fn kind(&self) -> &'static str {
        "failing"
    }
}

/// Broker that waits before accepting a message
#[derive(Debug, Clone)]
pub struct SlowBroker {
    delay: Duration,
    inner: RecordingBroker,
}

impl SlowBroker {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: RecordingBroker::new(),
        }
    }

    pub fn published(&self) -> Vec<TaskMessage> {
        self.inner.published()
    }
}

#[async_trait]
impl TaskBroker for SlowBroker {
    async fn publish(&self, message: TaskMessage) -> BackendResult<TaskId> {
        tokio::time::sleep(self.delay).await;
        self.inner.publish(message).await
    }

    async fn health(&self) -> BrokerHealth {
        BrokerHealth::connected(self.kind())
    }

    fn kind(&self) -> &'static str {
        "slow"
    }
}

/// Broker that panics inside publish
#[derive(Debug, Clone, Copy)]
pub struct PanickingBroker;

#[async_trait]
impl TaskBroker for PanickingBroker {
    async fn publish(&self, _message: TaskMessage) -> BackendResult<TaskId> {
        panic!("broker client bug");
    }

    async fn health(&self) -> BrokerHealth {
        BrokerHealth::connected(self.kind())
    }

    fn kind(&self) -> &'static str {
        "panicking"
    }
}

/// Movie search returning a fixed result
#[derive(Debug, Clone)]
pub struct MockMovieSearch {
    result: Result<Vec<MovieSummary>, String>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockMovieSearch {
    pub fn with_movies(movies: Vec<MovieSummary>) -> Self {
        Self {
            result: Ok(movies),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl Default for MockMovieSearch {
    fn default() -> Self {
        Self::with_movies(Vec::new())
    }
}

#[async_trait]
impl MovieSearch for MockMovieSearch {
    async fn search(&self, title: &str) -> BackendResult<Vec<MovieSummary>> {
        self.queries.lock().unwrap().push(title.to_string());
        self.result.clone().map_err(BackendError::upstream)
    }
}

pub fn sample_movie(title: &str, imdb_id: &str) -> MovieSummary {
    MovieSummary {
        title: title.to_string(),
        year: "2002".to_string(),
        imdb_id: imdb_id.to_string(),
        kind: "movie".to_string(),
        poster: "N/A".to_string(),
    }
}
