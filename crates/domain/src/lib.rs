//! 任务投递边界的领域模型
//!
//! HTTP 层只通过 [`TaskSignature`] 描述要执行的任务，任务名称字符串与外部
//! worker 之间没有共享的 schema，名称不匹配只会在 worker 一侧的日志中体现。

pub mod acknowledgment;
pub mod messaging;
pub mod movies;
pub mod task;

pub use acknowledgment::{DispatchAcknowledgment, DispatchStatus, FailureReason};
pub use messaging::{BrokerHealth, TaskBroker};
pub use movies::{MovieSearch, MovieSummary};
pub use movie_backend_errors::{BackendError, BackendResult};
pub use task::{ExampleTask, TaskId, TaskMessage, TaskSignature};
