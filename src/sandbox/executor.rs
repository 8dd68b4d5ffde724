use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};
use xlesson_sandbox_js::{BoaRuntime, JsRuntime, WorkerFailure, WorkerJob, WorkerOutcome};

use super::preview::{css_preview, html_preview};
use super::process::ProcessWorker;
use super::safety::{CodeAnalyzer, DenylistAnalyzer};
use super::types::{CodeSandbox, ExecutionResult, Language};
use super::worker::{CancelOnDrop, WorkerTracker};
use crate::config::{SandboxConfig, WorkerIsolation};
use crate::error::ExecutionError;

/// The execution sandbox.
///
/// Per JavaScript call: size check, safety scan, then one isolated worker raced
/// against the inner timeout. The worker is a child process when one can be found
/// (killed on timeout), else a blocking thread running the [`JsRuntime`]. The whole
/// call is raced against the outer timeout. Calls share nothing but the live-worker
/// counter.
pub struct Sandbox {
    config: SandboxConfig,
    runtime: Arc<dyn JsRuntime>,
    process: Option<ProcessWorker>,
    analyzer: Arc<dyn CodeAnalyzer>,
    workers: WorkerTracker,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new(SandboxConfig::default())
    }
}

impl Sandbox {
    /// A sandbox backed by the boa worker runtime, in a child process unless
    /// `worker.isolation` says otherwise or no worker executable can be found.
    pub fn new(config: SandboxConfig) -> Self {
        let runtime = Arc::new(BoaRuntime::new(config.runtime_config()));
        let process = match config.worker.isolation {
            WorkerIsolation::Process => {
                let located = ProcessWorker::locate(&config.worker, config.runtime_config());
                if located.is_none() {
                    warn!("no worker executable found; jobs run in-process and a timeout cannot stop them");
                }
                located
            }
            WorkerIsolation::InProcess => None,
        };
        Self {
            process,
            ..Self::with_runtime(config, runtime)
        }
    }

    /// A sandbox backed by any [`JsRuntime`] on a blocking thread, e.g. a test double.
    pub fn with_runtime(config: SandboxConfig, runtime: Arc<dyn JsRuntime>) -> Self {
        let analyzer = Arc::new(DenylistAnalyzer::new(config.safety.clone()));
        Self {
            config,
            runtime,
            process: None,
            analyzer,
            workers: WorkerTracker::new(),
        }
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn CodeAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Where jobs actually run.
    pub fn isolation(&self) -> WorkerIsolation {
        if self.process.is_some() {
            WorkerIsolation::Process
        } else {
            WorkerIsolation::InProcess
        }
    }

    /// Workers still running, including ones abandoned after a timeout.
    pub fn live_workers(&self) -> usize {
        self.workers.live()
    }

    async fn within_outer_budget<F>(&self, work: F) -> ExecutionResult
    where
        F: std::future::Future<Output = ExecutionResult>,
    {
        let started = Instant::now();
        let budget = self.config.outer_timeout();
        match tokio::time::timeout(budget, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!(budget_ms = budget.as_millis() as u64, "outer timeout fired");
                ExecutionResult::timed_out(budget, started.elapsed())
            }
        }
    }

    fn check_size(&self, code: &str) -> Result<(), ExecutionError> {
        let max = self.config.max_code_length;
        if code.len() > max {
            return Err(ExecutionError::CodeTooLarge {
                max,
                actual: code.len(),
            });
        }
        Ok(())
    }

    fn check_safety(&self, code: &str) -> Result<(), ExecutionError> {
        let analysis = self.analyzer.analyze(code);
        if let Some(violation) = analysis.violations.first() {
            warn!(
                kind = ?violation.kind,
                pattern = %violation.description,
                line = violation.location.0,
                column = violation.location.1,
                "code rejected by safety filter"
            );
            return Err(ExecutionError::SafetyViolation);
        }
        Ok(())
    }

    /// Pending -> SafetyChecked -> Running -> {Completed | Failed | TimedOut}
    async fn run_javascript(&self, job: WorkerJob) -> ExecutionResult {
        if let Err(e) = self
            .check_size(job.code())
            .and_then(|()| self.check_safety(job.code()))
        {
            return ExecutionResult::rejected(e);
        }
        debug!("safety checked");

        let started = Instant::now();
        let budget = self.config.inner_timeout();
        let result = match &self.process {
            Some(process) => self.run_in_process(process, job, budget, started).await,
            None => self.run_on_thread(job, budget, started).await,
        };
        debug!(
            status = ?result.status,
            elapsed_ms = result.execution_time_ms,
            "worker finished"
        );
        result
    }

    /// The lease is released once the child has exited or been killed. If the outer
    /// timeout drops this future first, the child is killed on drop.
    async fn run_in_process(
        &self,
        process: &ProcessWorker,
        job: WorkerJob,
        budget: Duration,
        started: Instant,
    ) -> ExecutionResult {
        let _lease = self.workers.lease();
        debug!(
            live_workers = self.workers.live(),
            program = %process.program().display(),
            "worker process running"
        );
        match process.run(job, budget).await {
            Ok(outcome) => from_outcome(outcome, budget, started.elapsed()),
            Err(ExecutionError::Timeout(_)) => ExecutionResult::timed_out(budget, started.elapsed()),
            Err(e) => ExecutionResult::failed(e, Vec::new(), started.elapsed()),
        }
    }

    /// The lease moves onto the blocking thread, so an abandoned worker keeps counting
    /// until the runtime returns.
    async fn run_on_thread(&self, job: WorkerJob, budget: Duration, started: Instant) -> ExecutionResult {
        let lease = self.workers.lease();
        let cancel = lease.cancel_flag();
        let _guard = CancelOnDrop(cancel.clone());
        let runtime = self.runtime.clone();

        debug!(live_workers = self.workers.live(), "worker running");
        let handle = tokio::task::spawn_blocking(move || {
            let _lease = lease;
            runtime.run(&job, &cancel)
        });

        match tokio::time::timeout(budget, handle).await {
            Ok(Ok(outcome)) => from_outcome(outcome, budget, started.elapsed()),
            Ok(Err(e)) => ExecutionResult::failed(
                ExecutionError::Internal(e.to_string()),
                Vec::new(),
                started.elapsed(),
            ),
            Err(_) => ExecutionResult::timed_out(budget, started.elapsed()),
        }
    }

    async fn execute_unbounded(&self, code: &str, language: Language) -> ExecutionResult {
        match language {
            Language::JavaScript => self.run_javascript(WorkerJob::script(code)).await,
            Language::Html | Language::Css => {
                let started = Instant::now();
                if let Err(e) = self.check_size(code) {
                    return ExecutionResult::rejected(e);
                }
                let html = match language {
                    Language::Css => css_preview(code),
                    _ => html_preview(code),
                };
                ExecutionResult::preview(html, started.elapsed())
            }
        }
    }

    /// Run `code` in `language`. Never fails at the type level.
    pub async fn execute(&self, code: &str, language: Language) -> ExecutionResult {
        debug!(language = %language, bytes = code.len(), "execution requested");
        self.within_outer_budget(self.execute_unbounded(code, language))
            .await
    }

    /// Like [`execute`](Self::execute) with a language tag; unknown tags are rejected.
    pub async fn execute_tagged(&self, code: &str, language: &str) -> ExecutionResult {
        match language.parse::<Language>() {
            Ok(language) => self.execute(code, language).await,
            Err(e) => ExecutionResult::rejected(e),
        }
    }

    /// Run `code`, then call `entry(input)` and capture the return value.
    pub async fn invoke(&self, code: &str, entry: &str, input: &Value) -> ExecutionResult {
        debug!(entry, bytes = code.len(), "invocation requested");
        let job = WorkerJob::invoke(code, entry, input.clone());
        self.within_outer_budget(self.run_javascript(job)).await
    }
}

fn from_outcome(outcome: WorkerOutcome, budget: Duration, elapsed: Duration) -> ExecutionResult {
    let WorkerOutcome { logs, result } = outcome;
    match result {
        Ok(value) => ExecutionResult::completed(logs, value, elapsed),
        Err(failure) => {
            let error = match failure {
                WorkerFailure::Runtime(message) => ExecutionError::Runtime(message),
                WorkerFailure::OutputFormat(message) => ExecutionError::OutputFormat(message),
                WorkerFailure::Setup(message) => ExecutionError::Internal(message),
                // only raised after this side stopped waiting
                WorkerFailure::Cancelled => ExecutionError::Timeout(budget.as_millis() as u64),
            };
            ExecutionResult::failed(error, logs, elapsed)
        }
    }
}

#[async_trait::async_trait]
impl CodeSandbox for Sandbox {
    async fn execute(&self, code: &str, language: Language) -> ExecutionResult {
        Sandbox::execute(self, code, language).await
    }

    async fn invoke(&self, code: &str, entry: &str, input: &Value) -> ExecutionResult {
        Sandbox::invoke(self, code, entry, input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::ExecutionStatus;
    use serde_json::json;
    use xlesson_sandbox_js::{CancelFlag, LogLevel, LogLine};

    /// Logs one line, then sleeps in small steps until done or cancelled.
    struct SlowRuntime {
        delay: Duration,
    }

    impl JsRuntime for SlowRuntime {
        fn run(&self, _job: &WorkerJob, cancel: &CancelFlag) -> WorkerOutcome {
            let logs = vec![LogLine::new(LogLevel::Log, "started")];
            let deadline = Instant::now() + self.delay;
            while Instant::now() < deadline {
                if cancel.is_cancelled() {
                    return WorkerOutcome::failed(logs, WorkerFailure::Cancelled);
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            WorkerOutcome::completed(logs, Some(json!("done")))
        }
    }

    fn config(timeout_ms: u64, outer_timeout_ms: u64) -> SandboxConfig {
        SandboxConfig {
            timeout_ms,
            outer_timeout_ms,
            ..SandboxConfig::default()
        }
    }

    async fn wait_for_no_workers(sandbox: &Sandbox) {
        for _ in 0..200 {
            if sandbox.live_workers() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("worker still alive: {}", sandbox.live_workers());
    }

    #[tokio::test]
    async fn test_safety_violation_spawns_nothing() {
        let sandbox = Sandbox::default();
        let result = sandbox.execute("eval(1)", Language::JavaScript).await;
        assert!(!result.success);
        assert_eq!(result.error, Some(ExecutionError::SafetyViolation));
        assert_eq!(result.status, ExecutionStatus::Rejected);
        assert_eq!(result.execution_time_ms, 0);
        assert_eq!(sandbox.live_workers(), 0);
    }

    #[tokio::test]
    async fn test_code_too_large() {
        let sandbox = Sandbox::new(SandboxConfig {
            max_code_length: 8,
            ..SandboxConfig::default()
        });
        let result = sandbox.execute("console.log(1)", Language::JavaScript).await;
        assert_eq!(
            result.error,
            Some(ExecutionError::CodeTooLarge { max: 8, actual: 14 })
        );
    }

    #[tokio::test]
    async fn test_console_capture() {
        let sandbox = Sandbox::default();
        let result = sandbox
            .execute(
                "console.log('a', 1); console.warn('b'); console.error({x: 1});",
                Language::JavaScript,
            )
            .await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.status, ExecutionStatus::Completed);
        assert_eq!(result.logs.len(), 3);
        assert_eq!(result.logs[1].level, LogLevel::Warn);
        assert_eq!(result.output.as_deref(), Some("a 1\n[warn] b\n[error] {\"x\":1}"));
        assert!(result.html.is_none());
    }

    #[tokio::test]
    async fn test_runtime_error_keeps_partial_logs() {
        let sandbox = Sandbox::default();
        let result = sandbox
            .execute("console.log('before'); null.x;", Language::JavaScript)
            .await;
        assert!(!result.success);
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert!(matches!(result.error, Some(ExecutionError::Runtime(_))));
        assert_eq!(result.output.as_deref(), Some("before"));
        assert!(result.html.is_none());
    }

    #[tokio::test]
    async fn test_invoke_returns_value() {
        let sandbox = Sandbox::default();
        let result = sandbox
            .invoke("function main(x) { return x * 2; }", "main", &json!(21))
            .await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.return_value, Some(json!(42)));
    }

    #[tokio::test]
    async fn test_html_and_css_previews() {
        let sandbox = Sandbox::default();
        let html = sandbox.execute("<p>hi</p>", Language::Html).await;
        assert!(html.success);
        assert_eq!(html.html.as_deref(), Some("<p>hi</p>"));

        let css = sandbox.execute("p { color: red; }", Language::Css).await;
        assert!(css.success);
        assert!(css.html.unwrap().contains("p { color: red; }"));
    }

    #[tokio::test]
    async fn test_unknown_language_tag() {
        let sandbox = Sandbox::default();
        let result = sandbox.execute_tagged("print(1)", "python").await;
        assert_eq!(result.status, ExecutionStatus::Rejected);
        assert_eq!(
            result.error,
            Some(ExecutionError::UnsupportedLanguage("python".into()))
        );
    }

    #[tokio::test]
    async fn test_isolation_follows_config() {
        let mut in_process = SandboxConfig::default();
        in_process.worker.isolation = WorkerIsolation::InProcess;
        assert_eq!(Sandbox::new(in_process).isolation(), WorkerIsolation::InProcess);

        let doubled = Sandbox::with_runtime(
            SandboxConfig::default(),
            Arc::new(SlowRuntime {
                delay: Duration::ZERO,
            }),
        );
        assert_eq!(doubled.isolation(), WorkerIsolation::InProcess);
    }

    #[tokio::test]
    async fn test_unstartable_worker_process_fails_cleanly() {
        let mut config = SandboxConfig::default();
        config.worker.program = Some("/nonexistent/xlesson".into());
        let sandbox = Sandbox::new(config);
        assert_eq!(sandbox.isolation(), WorkerIsolation::Process);

        let result = sandbox.execute("console.log(1)", Language::JavaScript).await;
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert!(matches!(result.error, Some(ExecutionError::Internal(_))));
        assert_eq!(sandbox.live_workers(), 0);
    }

    #[tokio::test]
    async fn test_inner_timeout_tears_down_worker() {
        let sandbox = Sandbox::with_runtime(
            config(50, 1_000),
            Arc::new(SlowRuntime {
                delay: Duration::from_secs(10),
            }),
        );
        let started = Instant::now();
        let result = sandbox.execute("slow()", Language::JavaScript).await;
        assert!(started.elapsed() < Duration::from_millis(900));
        assert!(result.is_timeout());
        assert_eq!(result.error, Some(ExecutionError::Timeout(50)));
        wait_for_no_workers(&sandbox).await;
    }

    #[tokio::test]
    async fn test_outer_timeout_wins() {
        let sandbox = Sandbox::with_runtime(
            config(5_000, 100),
            Arc::new(SlowRuntime {
                delay: Duration::from_secs(2),
            }),
        );
        let started = Instant::now();
        let result = sandbox.execute("slow()", Language::JavaScript).await;
        assert!(started.elapsed() < Duration::from_millis(1_000));
        assert_eq!(result.error, Some(ExecutionError::Timeout(100)));
        wait_for_no_workers(&sandbox).await;
    }

    #[tokio::test]
    async fn test_fast_worker_is_released() {
        let sandbox = Sandbox::with_runtime(
            config(1_000, 2_000),
            Arc::new(SlowRuntime {
                delay: Duration::from_millis(10),
            }),
        );
        let result = sandbox.invoke("f()", "main", &Value::Null).await;
        assert!(result.success);
        assert_eq!(result.return_value, Some(json!("done")));
        assert_eq!(result.output.as_deref(), Some("started"));
        wait_for_no_workers(&sandbox).await;
    }
}
