use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use xlesson_sandbox_js::LogLine;

use crate::error::ExecutionError;

// ================================
// CodeSandbox Trait
// ================================

/// Execution interface the exercise and challenge surfaces call into.
///
/// Failures travel inside the returned [`ExecutionResult`], so both methods are
/// infallible at the type level.
#[async_trait::async_trait]
pub trait CodeSandbox: Send + Sync {
    /// Supported language list
    fn supported_languages(&self) -> Vec<Language> {
        Language::ALL.to_vec()
    }

    /// Run `code` as a script (JavaScript) or turn it into a preview document (HTML/CSS).
    async fn execute(&self, code: &str, language: Language) -> ExecutionResult;

    /// Run JavaScript `code`, then call the global function `entry` with `input`
    /// and capture its return value as structured data.
    async fn invoke(&self, code: &str, entry: &str, input: &Value) -> ExecutionResult;
}

// ================================
// Enums
// ================================

/// Languages a lesson can declare for runnable code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    Html,
    Css,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::JavaScript, Language::Html, Language::Css];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Html => "html",
            Language::Css => "css",
        }
    }

    /// Markup languages are previewed, not executed.
    pub fn is_markup(&self) -> bool {
        matches!(self, Language::Html | Language::Css)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ExecutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "javascript" | "js" => Ok(Language::JavaScript),
            "html" | "htm" => Ok(Language::Html),
            "css" => Ok(Language::Css),
            other => Err(ExecutionError::UnsupportedLanguage(other.to_string())),
        }
    }
}

/// Terminal state of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    Failed,
    TimedOut,
    /// Refused before a worker was spawned (size limit, safety denylist, language).
    Rejected,
}

// ================================
// Result
// ================================

/// Outcome of a single `execute` or `invoke` call. Built fresh per call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,

    /// Captured log lines joined with newlines
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,

    pub execution_time_ms: u64,

    /// Renderable document, markup languages only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    pub logs: Vec<LogLine>,

    /// Return value of the entry function (`invoke` only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_value: Option<Value>,

    pub status: ExecutionStatus,
}

fn millis(elapsed: Duration) -> u64 {
    elapsed.as_millis().min(u64::MAX as u128) as u64
}

fn join_logs(logs: &[LogLine]) -> String {
    logs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl ExecutionResult {
    pub fn completed(logs: Vec<LogLine>, return_value: Option<Value>, elapsed: Duration) -> Self {
        Self {
            success: true,
            output: Some(join_logs(&logs)),
            error: None,
            execution_time_ms: millis(elapsed),
            html: None,
            logs,
            return_value,
            status: ExecutionStatus::Completed,
        }
    }

    pub fn preview(html: String, elapsed: Duration) -> Self {
        Self {
            success: true,
            output: None,
            error: None,
            execution_time_ms: millis(elapsed),
            html: Some(html),
            logs: Vec::new(),
            return_value: None,
            status: ExecutionStatus::Completed,
        }
    }

    /// Partial logs are kept; `html` is always absent on failure.
    pub fn failed(error: ExecutionError, logs: Vec<LogLine>, elapsed: Duration) -> Self {
        let status = if error.is_timeout() {
            ExecutionStatus::TimedOut
        } else {
            ExecutionStatus::Failed
        };
        Self {
            success: false,
            output: (!logs.is_empty()).then(|| join_logs(&logs)),
            error: Some(error),
            execution_time_ms: millis(elapsed),
            html: None,
            logs,
            return_value: None,
            status,
        }
    }

    pub fn timed_out(budget: Duration, elapsed: Duration) -> Self {
        Self::failed(ExecutionError::Timeout(millis(budget)), Vec::new(), elapsed)
    }

    /// Refused before any worker existed; elapsed time is zero.
    pub fn rejected(error: ExecutionError) -> Self {
        Self {
            status: ExecutionStatus::Rejected,
            execution_time_ms: 0,
            ..Self::failed(error, Vec::new(), Duration::ZERO)
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.status == ExecutionStatus::TimedOut
    }
}
