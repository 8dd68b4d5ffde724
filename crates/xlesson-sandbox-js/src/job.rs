use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Work handed to an isolated worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerJob {
    /// Run a script for its console output.
    Script { code: Arc<str> },
    /// Run a script, then call `entry(input)` and capture the return value.
    Invoke {
        code: Arc<str>,
        entry: String,
        input: Value,
    },
}

impl WorkerJob {
    pub fn script(code: impl Into<Arc<str>>) -> Self {
        WorkerJob::Script { code: code.into() }
    }

    pub fn invoke(code: impl Into<Arc<str>>, entry: impl Into<String>, input: Value) -> Self {
        WorkerJob::Invoke {
            code: code.into(),
            entry: entry.into(),
            input,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            WorkerJob::Script { code } | WorkerJob::Invoke { code, .. } => code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Log,
    Info,
    Warn,
    Error,
}

/// One captured `console.*` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
}

impl LogLine {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            LogLevel::Log | LogLevel::Info => f.write_str(&self.message),
            LogLevel::Warn => write!(f, "[warn] {}", self.message),
            LogLevel::Error => write!(f, "[error] {}", self.message),
        }
    }
}

/// Why a worker did not produce a value.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum WorkerFailure {
    /// The learner's code threw, failed to parse, or hit a runtime limit.
    #[error("{0}")]
    Runtime(String),

    /// The entry function returned something that is not plain JSON data.
    #[error("{0}")]
    OutputFormat(String),

    /// The context could not be prepared.
    #[error("worker setup failed: {0}")]
    Setup(String),

    /// The owner stopped waiting and asked the worker to stop.
    #[error("worker cancelled")]
    Cancelled,
}

/// Everything a worker reports back: logs captured so far plus the value or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerOutcome {
    pub logs: Vec<LogLine>,
    pub result: Result<Option<Value>, WorkerFailure>,
}

impl WorkerOutcome {
    pub fn completed(logs: Vec<LogLine>, value: Option<Value>) -> Self {
        Self {
            logs,
            result: Ok(value),
        }
    }

    pub fn failed(logs: Vec<LogLine>, failure: WorkerFailure) -> Self {
        Self {
            logs,
            result: Err(failure),
        }
    }
}

/// Cooperative stop signal shared between the sandbox and its worker.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
