//! Execution Sandbox
//!
//! Runs learner JavaScript in an isolated worker behind a safety denylist and two
//! wall-clock budgets, and turns HTML/CSS into preview documents. Workers are child
//! processes running `xlesson worker` by default, so a timeout kills them outright.

pub mod executor;
pub mod preview;
pub mod process;
pub mod safety;
pub mod types;
pub mod worker;

pub use executor::Sandbox;
pub use process::{ProcessWorker, WORKER_ENV};
pub use safety::{
    CodeAnalysisResult, CodeAnalyzer, CodeViolation, DenylistAnalyzer, SafetyPolicy, ViolationKind,
};
pub use types::*;
pub use worker::{WorkerLease, WorkerTracker};
pub use xlesson_sandbox_js::serve_stdio as serve_worker;
