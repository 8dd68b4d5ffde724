//! The boa-backed isolated worker.

use boa_engine::builtins::promise::PromiseState;
use boa_engine::{Context, JsError, JsValue, Source};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::job::{CancelFlag, LogLine, WorkerFailure, WorkerJob, WorkerOutcome};
use crate::prelude;

/// An execution unit that runs one job to completion on the calling thread.
///
/// Implementations must not share mutable state between jobs. The sandbox calls
/// `run` from a blocking thread and may stop waiting at any time; `cancel` is set
/// when it does.
pub trait JsRuntime: Send + Sync + 'static {
    fn run(&self, job: &WorkerJob, cancel: &CancelFlag) -> WorkerOutcome;
}

/// Engine-level limits and global isolation for [`BoaRuntime`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoaRuntimeConfig {
    /// Iterations any single loop may run before the engine throws; also caps the
    /// number of timer callbacks one job may fire
    pub loop_iteration_limit: u64,

    /// Maximum call depth
    pub recursion_limit: usize,

    /// Delete every configurable global outside `allowed_globals`
    pub prune_globals: bool,

    /// Freeze the global object and core prototypes after pruning
    pub freeze_globals: bool,

    /// Globals that survive pruning
    pub allowed_globals: Vec<String>,
}

impl Default for BoaRuntimeConfig {
    fn default() -> Self {
        Self {
            loop_iteration_limit: 10_000_000,
            recursion_limit: 400,
            prune_globals: true,
            freeze_globals: false,
            allowed_globals: default_allowed_globals(),
        }
    }
}

/// The standard library a learner can count on.
pub fn default_allowed_globals() -> Vec<String> {
    [
        "JSON",
        "Math",
        "Number",
        "String",
        "Boolean",
        "Array",
        "Object",
        "Symbol",
        "Map",
        "Set",
        "WeakMap",
        "WeakSet",
        "Date",
        "RegExp",
        "Promise",
        "Error",
        "TypeError",
        "RangeError",
        "SyntaxError",
        "ReferenceError",
        "parseInt",
        "parseFloat",
        "isNaN",
        "isFinite",
        "encodeURIComponent",
        "decodeURIComponent",
        "encodeURI",
        "decodeURI",
        "NaN",
        "Infinity",
        "undefined",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

/// `[A-Za-z_$][A-Za-z0-9_$]*`, Unicode letters included.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Runs each job in a fresh `boa_engine` context.
#[derive(Debug, Clone, Default)]
pub struct BoaRuntime {
    config: BoaRuntimeConfig,
}

impl BoaRuntime {
    pub fn new(config: BoaRuntimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BoaRuntimeConfig {
        &self.config
    }

    fn new_context(&self) -> Context {
        let mut context = Context::default();
        let limits = context.runtime_limits_mut();
        limits.set_loop_iteration_limit(self.config.loop_iteration_limit);
        limits.set_recursion_limit(self.config.recursion_limit);
        context
    }

    fn prepare_script(&self, code: &str) -> String {
        if self.config.prune_globals {
            prelude::wrap_user_code(code, &self.config.allowed_globals, self.config.freeze_globals)
        } else {
            format!("{}\n{}\n", prelude::shims(), code)
        }
    }
}

impl JsRuntime for BoaRuntime {
    fn run(&self, job: &WorkerJob, cancel: &CancelFlag) -> WorkerOutcome {
        if cancel.is_cancelled() {
            return WorkerOutcome::failed(Vec::new(), WorkerFailure::Cancelled);
        }

        let mut context = self.new_context();
        let script = self.prepare_script(job.code());
        let turns = self.config.loop_iteration_limit;

        let loaded = context
            .eval(Source::from_bytes(&script))
            .map_err(|e| WorkerFailure::Runtime(e.to_string()))
            .and_then(|_| drain(&mut context, cancel, turns));
        if let Err(failure) = loaded {
            let logs = read_logs(&mut context);
            return WorkerOutcome::failed(logs, failure);
        }

        match job {
            WorkerJob::Script { .. } => WorkerOutcome::completed(read_logs(&mut context), None),
            WorkerJob::Invoke { entry, input, .. } => {
                if cancel.is_cancelled() {
                    let logs = read_logs(&mut context);
                    return WorkerOutcome::failed(logs, WorkerFailure::Cancelled);
                }
                let result = invoke_entry(&mut context, entry, input, cancel, turns);
                let logs = read_logs(&mut context);
                match result {
                    Ok(value) => WorkerOutcome::completed(logs, Some(value)),
                    Err(failure) => WorkerOutcome::failed(logs, failure),
                }
            }
        }
    }
}

/// Run promise jobs until the microtask queue is empty, then fire the next timer, until
/// neither is left. At most `turns` timers fire.
fn drain(context: &mut Context, cancel: &CancelFlag, turns: u64) -> Result<(), WorkerFailure> {
    let mut fired = 0u64;
    loop {
        context.run_jobs();
        if cancel.is_cancelled() {
            return Err(WorkerFailure::Cancelled);
        }
        let more = context
            .eval(Source::from_bytes(prelude::RUN_NEXT_TIMER))
            .map_err(|e| WorkerFailure::Runtime(e.to_string()))?;
        if !more.to_boolean() {
            return Ok(());
        }
        fired += 1;
        if fired > turns {
            return Err(WorkerFailure::Runtime(format!(
                "more than {} timer callbacks fired",
                turns
            )));
        }
    }
}

/// A returned promise stands for its settled value.
fn settled(value: JsValue) -> Result<JsValue, WorkerFailure> {
    let Some(promise) = value.as_promise() else {
        return Ok(value);
    };
    match promise.state() {
        PromiseState::Fulfilled(value) => Ok(value),
        PromiseState::Rejected(reason) => {
            Err(WorkerFailure::Runtime(JsError::from_opaque(reason).to_string()))
        }
        PromiseState::Pending => Err(WorkerFailure::Runtime(
            "the entry function returned a promise that never settled".into(),
        )),
    }
}

/// Resolve `entry` in the script's scope (so `const`/`let` bindings count), call it with
/// `input` converted straight into a JS value, wait for a returned promise to settle, then
/// encode the result strictly.
fn invoke_entry(
    context: &mut Context,
    entry: &str,
    input: &Value,
    cancel: &CancelFlag,
    turns: u64,
) -> Result<Value, WorkerFailure> {
    if !is_identifier(entry) {
        return Err(WorkerFailure::Setup(format!(
            "`{}` is not a JavaScript identifier",
            entry
        )));
    }
    let argument = JsValue::from_json(input, context)
        .map_err(|e| WorkerFailure::Setup(format!("input could not be converted: {}", e)))?;

    let lookup = format!("typeof {entry} === 'function' ? {entry} : undefined");
    let function = context
        .eval(Source::from_bytes(&lookup))
        .map_err(|e| WorkerFailure::Runtime(e.to_string()))?;
    let callable = function.as_callable().ok_or_else(|| {
        WorkerFailure::Runtime(format!("`{}` is not defined as a function", entry))
    })?;

    let returned = callable
        .call(&JsValue::undefined(), &[argument], context)
        .map_err(|e| WorkerFailure::Runtime(e.to_string()))?;
    drain(context, cancel, turns)?;
    let returned = settled(returned)?;

    let encoder_value = context
        .eval(Source::from_bytes(prelude::STRICT_ENCODER))
        .map_err(|e| WorkerFailure::Setup(format!("output encoder failed to load: {}", e)))?;
    let encoder = encoder_value
        .as_callable()
        .ok_or_else(|| WorkerFailure::Setup("output encoder is not callable".into()))?;

    let encoded = encoder
        .call(&JsValue::undefined(), &[returned], context)
        .map_err(|e| WorkerFailure::OutputFormat(e.to_string()))?;
    let text = encoded
        .as_string()
        .map(|s| s.to_std_string_escaped())
        .ok_or_else(|| WorkerFailure::OutputFormat("return value has no JSON form".into()))?;

    serde_json::from_str(&text).map_err(|e| WorkerFailure::OutputFormat(e.to_string()))
}

fn read_logs(context: &mut Context) -> Vec<LogLine> {
    let raw = match context.eval(Source::from_bytes(prelude::READ_LOGS)) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "console log buffer unreadable");
            return Vec::new();
        }
    };
    let Some(text) = raw.as_string().map(|s| s.to_std_string_escaped()) else {
        return Vec::new();
    };
    serde_json::from_str::<Vec<Value>>(&text)
        .map(|entries| {
            entries
                .into_iter()
                .filter_map(|entry| serde_json::from_value::<LogLine>(entry).ok())
                .collect()
        })
        .unwrap_or_default()
}
