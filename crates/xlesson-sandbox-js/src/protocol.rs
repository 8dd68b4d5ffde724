//! Wire format between the sandbox and a worker process.
//!
//! The parent writes one [`WorkerRequest`] as JSON to the child's stdin and closes it;
//! the child runs the job and writes one [`WorkerOutcome`] as JSON to stdout, then
//! exits. A child that runs too long is killed, so nothing here needs to be cancellable.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

use crate::job::{CancelFlag, WorkerFailure, WorkerJob, WorkerOutcome};
use crate::runtime::{BoaRuntime, BoaRuntimeConfig, JsRuntime};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRequest {
    #[serde(default)]
    pub config: BoaRuntimeConfig,
    pub job: WorkerJob,
}

impl WorkerRequest {
    pub fn new(config: BoaRuntimeConfig, job: WorkerJob) -> Self {
        Self { config, job }
    }
}

/// Read one request from `input`, run it, and write the outcome to `output`.
///
/// A request that does not parse is answered with a setup failure rather than an
/// I/O error, so the parent always gets an outcome to report.
pub fn serve<R: Read, W: Write>(mut input: R, mut output: W) -> io::Result<()> {
    let mut raw = Vec::new();
    input.read_to_end(&mut raw)?;

    let outcome = match serde_json::from_slice::<WorkerRequest>(&raw) {
        Ok(request) => BoaRuntime::new(request.config).run(&request.job, &CancelFlag::new()),
        Err(e) => WorkerOutcome::failed(
            Vec::new(),
            WorkerFailure::Setup(format!("malformed worker request: {}", e)),
        ),
    };

    serde_json::to_writer(&mut output, &outcome)?;
    output.flush()
}

/// [`serve`] over the process's own stdin and stdout.
pub fn serve_stdio() -> io::Result<()> {
    serve(io::stdin().lock(), io::stdout().lock())
}
