use serde::{Deserialize, Serialize};
use serde_json::Value;
use xlesson_sandbox_js::LogLine;

use crate::error::ExecutionError;

/// One declared test case: call the entry function with `input`, expect `expected_output`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(default)]
    pub input: Value,
    #[serde(alias = "expected_output", alias = "expected")]
    pub expected_output: Value,
    #[serde(default)]
    pub description: String,
}

impl TestCase {
    pub fn new(input: Value, expected_output: Value, description: impl Into<String>) -> Self {
        Self {
            input,
            expected_output,
            description: description.into(),
        }
    }
}

/// Coarse classification of a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictOutcome {
    Passed,
    /// Ran fine, returned the wrong value
    Mismatch,
    /// Did not produce a comparable value
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestVerdict {
    pub description: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<LogLine>,
}

impl TestVerdict {
    pub fn outcome(&self) -> VerdictOutcome {
        if self.passed {
            VerdictOutcome::Passed
        } else if self.error.is_some() {
            VerdictOutcome::Error
        } else {
            VerdictOutcome::Mismatch
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunReport {
    pub passed_count: usize,
    pub total_count: usize,
    pub verdicts: Vec<TestVerdict>,
}

impl TestRunReport {
    pub fn from_verdicts(verdicts: Vec<TestVerdict>) -> Self {
        Self {
            passed_count: verdicts.iter().filter(|v| v.passed).count(),
            total_count: verdicts.len(),
            verdicts,
        }
    }

    /// True when every case passed; an empty run counts as passed.
    pub fn all_passed(&self) -> bool {
        self.passed_count == self.total_count
    }
}
