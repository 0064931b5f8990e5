use movie_backend_errors::{BackendError, BackendResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 投递时生成的任务标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for TaskId {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| BackendError::serialization(format!("无效的任务ID {s}: {e}")))
    }
}

/// 发送给消息代理的任务消息
///
/// 每次投递创建一条，发布后由代理和 worker 持有，投递方不再保留引用。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    pub id: TaskId,
    pub task_name: String,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

impl TaskMessage {
    pub fn new(task_name: impl Into<String>, args: Vec<Value>, kwargs: Map<String, Value>) -> Self {
        Self {
            id: TaskId::new(),
            task_name: task_name.into(),
            args,
            kwargs,
        }
    }

    /// 由任意可序列化的参数构造消息
    ///
    /// `args` 必须编码为 JSON 数组，`kwargs` 必须编码为 JSON 对象，`null` 视为空。
    pub fn from_serializable<A, K>(task_name: &str, args: &A, kwargs: &K) -> BackendResult<Self>
    where
        A: Serialize + ?Sized,
        K: Serialize + ?Sized,
    {
        let args = match serde_json::to_value(args)? {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => {
                return Err(BackendError::serialization(format!(
                    "位置参数必须是序列，实际为 {}",
                    json_kind(&other)
                )))
            }
        };

        let kwargs = match serde_json::to_value(kwargs)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(BackendError::serialization(format!(
                    "关键字参数必须是映射，实际为 {}",
                    json_kind(&other)
                )))
            }
        };

        Ok(Self::new(task_name, args, kwargs))
    }

    /// 代理发布前的输入检查，只校验名称非空，不校验 worker 是否注册了该任务
    pub fn ensure_publishable(&self) -> BackendResult<()> {
        if self.task_name.trim().is_empty() {
            return Err(BackendError::InvalidTaskName(self.task_name.clone()));
        }
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 带类型的任务描述
///
/// 任务名称字符串只出现在实现这个 trait 的地方，调用方不感知命名约定。
pub trait TaskSignature: Send + Sync {
    /// worker 端注册的任务名
    const NAME: &'static str;

    fn args(&self) -> Vec<Value> {
        Vec::new()
    }

    fn kwargs(&self) -> Map<String, Value> {
        Map::new()
    }

    fn to_message(&self) -> TaskMessage {
        TaskMessage::new(Self::NAME, self.args(), self.kwargs())
    }
}

/// worker 端的演示任务 `app.tasks.example_task(word)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleTask {
    pub word: String,
}

impl ExampleTask {
    pub fn new(word: impl Into<String>) -> Self {
        Self { word: word.into() }
    }

    pub fn hello_world() -> Self {
        Self::new("Hello World")
    }
}

impl TaskSignature for ExampleTask {
    const NAME: &'static str = "app.tasks.example_task";

    fn args(&self) -> Vec<Value> {
        vec![Value::String(self.word.clone())]
    }
}
