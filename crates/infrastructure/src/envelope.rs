//! Celery 消息协议 v2 的任务封包
//!
//! worker 端是 Celery，消息头携带任务名和ID，消息体为
//! `[args, kwargs, {"callbacks", "errbacks", "chain", "chord"}]` 的 JSON 数组。

use movie_backend_domain::{TaskId, TaskMessage};
use movie_backend_errors::{BackendError, BackendResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const CONTENT_TYPE: &str = "application/json";
pub const CONTENT_ENCODING: &str = "utf-8";
/// AMQP 持久化投递
pub const DELIVERY_MODE_PERSISTENT: u8 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskHeaders {
    pub lang: String,
    pub task: String,
    pub id: String,
    pub root_id: String,
    pub parent_id: Option<String>,
    pub group: Option<String>,
    pub shadow: Option<String>,
    pub eta: Option<String>,
    pub expires: Option<String>,
    pub retries: u32,
    /// (软超时, 硬超时)，未设置时为 null
    pub timelimit: (Option<u64>, Option<u64>),
    pub argsrepr: String,
    pub kwargsrepr: String,
    pub origin: String,
    pub ignore_result: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct EmbedOptions {
    callbacks: Option<Value>,
    errbacks: Option<Value>,
    chain: Option<Value>,
    chord: Option<Value>,
}

/// 编码完成、可直接发布的任务封包
#[derive(Debug, Clone, PartialEq)]
pub struct TaskEnvelope {
    pub headers: TaskHeaders,
    pub body: Vec<u8>,
    pub correlation_id: String,
    pub content_type: &'static str,
    pub content_encoding: &'static str,
    pub delivery_mode: u8,
    pub priority: u8,
}

impl TaskEnvelope {
    pub fn task_id(&self) -> BackendResult<TaskId> {
        self.headers.id.parse()
    }

    pub fn decode(&self) -> BackendResult<TaskMessage> {
        decode_envelope(&self.headers, &self.body)
    }

    /// 头部的 JSON 表示，供 AMQP 头部表转换使用
    pub fn headers_json(&self) -> BackendResult<Map<String, Value>> {
        match serde_json::to_value(&self.headers)? {
            Value::Object(map) => Ok(map),
            _ => Err(BackendError::serialization("任务消息头必须编码为对象")),
        }
    }
}

pub fn encode_envelope(message: &TaskMessage, origin: &str) -> BackendResult<TaskEnvelope> {
    let id = message.id.to_string();
    let body = serde_json::to_vec(&(&message.args, &message.kwargs, EmbedOptions::default()))?;

    let headers = TaskHeaders {
        lang: "py".to_string(),
        task: message.task_name.clone(),
        id: id.clone(),
        root_id: id.clone(),
        parent_id: None,
        group: None,
        shadow: None,
        eta: None,
        expires: None,
        retries: 0,
        timelimit: (None, None),
        argsrepr: serde_json::to_string(&message.args)?,
        kwargsrepr: serde_json::to_string(&message.kwargs)?,
        origin: origin.to_string(),
        ignore_result: false,
    };

    Ok(TaskEnvelope {
        headers,
        body,
        correlation_id: id,
        content_type: CONTENT_TYPE,
        content_encoding: CONTENT_ENCODING,
        delivery_mode: DELIVERY_MODE_PERSISTENT,
        priority: 0,
    })
}

pub fn decode_envelope(headers: &TaskHeaders, body: &[u8]) -> BackendResult<TaskMessage> {
    let (args, kwargs, _embed): (Vec<Value>, Map<String, Value>, Value) =
        serde_json::from_slice(body)?;

    Ok(TaskMessage {
        id: headers.id.parse()?,
        task_name: headers.task.clone(),
        args,
        kwargs,
    })
}

/// Celery 的 origin 格式：`<pid>@<hostname>`
pub fn default_origin() -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string());
    format!("{}@{}", std::process::id(), host)
}
