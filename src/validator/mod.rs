//! Test-Case Validator: runs learner code against declared test cases through the
//! execution sandbox and compares the entry function's return value structurally.

mod compare;
mod types;

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ValidatorConfig;
use crate::error::ExecutionError;
use crate::sandbox::CodeSandbox;

pub use compare::json_equal;
pub use types::{TestCase, TestRunReport, TestVerdict, VerdictOutcome};

pub struct Validator {
    sandbox: Arc<dyn CodeSandbox>,
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(sandbox: Arc<dyn CodeSandbox>) -> Self {
        Self::with_config(sandbox, ValidatorConfig::default())
    }

    pub fn with_config(sandbox: Arc<dyn CodeSandbox>, config: ValidatorConfig) -> Self {
        Self { sandbox, config }
    }

    pub fn entry_function(&self) -> &str {
        &self.config.entry_function
    }

    /// Run every case in order. A failing case never stops the ones after it.
    pub async fn validate(&self, code: &str, test_cases: &[TestCase]) -> TestRunReport {
        let mut verdicts = Vec::with_capacity(test_cases.len());
        for (index, case) in test_cases.iter().enumerate() {
            let verdict = self.run_case(code, case).await;
            debug!(
                case = index + 1,
                outcome = ?verdict.outcome(),
                "test case finished"
            );
            verdicts.push(verdict);
        }
        let report = TestRunReport::from_verdicts(verdicts);
        info!(
            passed = report.passed_count,
            total = report.total_count,
            "validation finished"
        );
        report
    }

    pub async fn run_case(&self, code: &str, case: &TestCase) -> TestVerdict {
        let result = self
            .sandbox
            .invoke(code, &self.config.entry_function, &case.input)
            .await;

        let (passed, error) = match (&result.error, &result.return_value) {
            (Some(error), _) => (false, Some(error.clone())),
            (None, Some(actual)) => (json_equal(actual, &case.expected_output), None),
            (None, None) => (
                false,
                Some(ExecutionError::OutputFormat(
                    "the entry function produced no value".into(),
                )),
            ),
        };

        TestVerdict {
            description: case.description.clone(),
            passed: passed && result.success,
            actual_output: result.return_value,
            error,
            logs: result.logs,
        }
    }
}
