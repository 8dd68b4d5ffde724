use serde::Serialize;
use thiserror::Error;

/// Execution and validation errors. These travel inside result values, never as `Err`
/// out of the public sandbox or validator entry points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "type", content = "message", rename_all = "snake_case")]
pub enum ExecutionError {
    /// Code matched the safety denylist. Deliberately does not say which pattern.
    #[error("unsafe code: this submission uses features that are not allowed here")]
    SafetyViolation,

    #[error("execution timed out after {0} ms")]
    Timeout(u64),

    #[error("{0}")]
    Runtime(String),

    /// The return value could not be read as structured data.
    #[error("output format error: {0}")]
    OutputFormat(String),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("code too large (max {max} bytes, got {actual} bytes)")]
    CodeTooLarge { max: usize, actual: usize },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ExecutionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutionError::Timeout(_))
    }
}
