//! 任务投递层
//!
//! HTTP 处理器通过 [`TaskDispatcher`] 把任务交给消息代理。投递是单向的：
//! 返回的确认只说明消息已被代理接收，不等待任务执行结果。

pub mod task_dispatcher;

pub use task_dispatcher::TaskDispatcher;
