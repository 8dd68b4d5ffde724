//! Isolated JavaScript worker for the xlesson execution sandbox.
//!
//! Each job runs in a brand-new `boa_engine` [`Context`](boa_engine::Context): no host DOM,
//! no network, and only an allowlisted set of globals. `console.*` calls are captured as
//! ordered [`LogLine`]s instead of reaching a real console; promise jobs and virtual-clock
//! `setTimeout` callbacks run to completion before a job reports back.
//!
//! [`protocol`] lets a job run in a separate process that the owner can kill.

pub mod job;
pub mod prelude;
pub mod protocol;
pub mod runtime;

pub use job::{CancelFlag, LogLevel, LogLine, WorkerFailure, WorkerJob, WorkerOutcome};
pub use protocol::{serve, serve_stdio, WorkerRequest};
pub use runtime::{default_allowed_globals, is_identifier, BoaRuntime, BoaRuntimeConfig, JsRuntime};

// Re-export boa_engine for consumers that want to drive a context directly (benches, tools)
pub use boa_engine;
