//! Worker processes: one child per job, killed when its budget runs out.
//!
//! boa cannot be interrupted mid-evaluation, so a runaway job on a thread keeps its
//! CPU until it finishes on its own. A child process can always be stopped.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};
use xlesson_sandbox_js::{BoaRuntimeConfig, WorkerJob, WorkerOutcome, WorkerRequest};

use crate::config::WorkerConfig;
use crate::error::ExecutionError;

/// Environment variable naming the worker executable when the config does not.
pub const WORKER_ENV: &str = "XLESSON_WORKER";

/// Spawns `program args...` per job and speaks the JSON worker protocol over its
/// stdin and stdout.
#[derive(Debug, Clone)]
pub struct ProcessWorker {
    program: PathBuf,
    args: Vec<String>,
    runtime: BoaRuntimeConfig,
}

impl ProcessWorker {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, runtime: BoaRuntimeConfig) -> Self {
        Self {
            program: program.into(),
            args,
            runtime,
        }
    }

    /// The configured program, else `$XLESSON_WORKER`, else an `xlesson` binary in the
    /// current executable's directory or the one above it (`target/debug/deps` layout).
    pub fn locate(worker: &WorkerConfig, runtime: BoaRuntimeConfig) -> Option<Self> {
        let program = worker
            .program
            .clone()
            .or_else(|| std::env::var_os(WORKER_ENV).map(PathBuf::from))
            .or_else(sibling_binary)?;
        Some(Self::new(program, worker.args.clone(), runtime))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run one job. On timeout the child is killed and reaped before this returns.
    pub async fn run(&self, job: WorkerJob, budget: Duration) -> Result<WorkerOutcome, ExecutionError> {
        let request = serde_json::to_vec(&WorkerRequest::new(self.runtime.clone(), job))
            .map_err(|e| ExecutionError::Internal(format!("worker request: {}", e)))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ExecutionError::Internal(format!(
                    "failed to start worker {}: {}",
                    self.program.display(),
                    e
                ))
            })?;
        debug!(pid = ?child.id(), "worker process spawned");

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let exchanged = tokio::time::timeout(budget, exchange(stdin, stdout, &request)).await;

        let output = match exchanged {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                kill(&mut child).await;
                return Err(ExecutionError::Internal(format!("worker pipe: {}", e)));
            }
            Err(_) => {
                kill(&mut child).await;
                return Err(ExecutionError::Timeout(budget.as_millis() as u64));
            }
        };

        let status = child
            .wait()
            .await
            .map_err(|e| ExecutionError::Internal(format!("worker wait: {}", e)))?;
        if output.is_empty() {
            return Err(ExecutionError::Internal(format!(
                "worker exited ({}) without an outcome",
                status
            )));
        }
        serde_json::from_slice(&output)
            .map_err(|e| ExecutionError::Internal(format!("unreadable worker outcome: {}", e)))
    }
}

async fn exchange(
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    request: &[u8],
) -> io::Result<Vec<u8>> {
    let (Some(mut stdin), Some(mut stdout)) = (stdin, stdout) else {
        return Err(io::Error::new(io::ErrorKind::BrokenPipe, "worker pipes unavailable"));
    };
    stdin.write_all(request).await?;
    drop(stdin);

    let mut output = Vec::new();
    stdout.read_to_end(&mut output).await?;
    Ok(output)
}

async fn kill(child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill worker process");
    } else {
        debug!("worker process killed");
    }
}

fn sibling_binary() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let name = format!("xlesson{}", std::env::consts::EXE_SUFFIX);
    exe.ancestors()
        .skip(1)
        .take(2)
        .map(|dir| dir.join(&name))
        .find(|candidate| candidate.is_file())
}
