//! Factorio executor for running the game as a supervised subprocess.
//!
//! A launched process is owned by a background task that races the child's
//! natural exit against a [`CancellationToken`]. Whichever happens first
//! decides the [`ExitOutcome`], which the caller receives exactly once by
//! awaiting the returned [`FactorioProcess`].

use std::ffi::{OsStr, OsString};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::task::{ready, Context, Poll};

use mapshot_core::ExitOutcome;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::FactorioError;

/// Arguments for a headless-ish render run.
///
/// Audio and prototype history are disabled and graphics forced to the
/// lowest preset; none of it matters for screenshots and it speeds up load.
pub fn launch_args(save: &Path, mods: &Path) -> Vec<OsString> {
    vec![
        "--disable-audio".into(),
        "--disable-prototype-history".into(),
        "--load-game".into(),
        save.as_os_str().to_owned(),
        "--mod-directory".into(),
        mods.as_os_str().to_owned(),
        "--force-graphics-preset".into(),
        "very-low".into(),
    ]
}

/// Executor for the Factorio binary.
#[derive(Debug, Clone)]
pub struct FactorioExecutor {
    /// Path to the Factorio executable.
    binary: PathBuf,
}

impl FactorioExecutor {
    /// Create a new executor for the given binary.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Start the binary in the background.
    ///
    /// Returns as soon as the process is spawned. Cancelling `cancel` kills
    /// the process and resolves the returned handle to
    /// [`ExitOutcome::Cancelled`]; cancelling after it exited has no effect.
    pub fn launch<I, S>(
        &self,
        args: I,
        cancel: CancellationToken,
    ) -> Result<FactorioProcess, FactorioError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(binary = %self.binary.display(), "Spawning Factorio process");
        debug!("Full command: {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| {
            error!(error = %e, "Failed to spawn Factorio process");
            FactorioError::Spawn {
                path: self.binary.clone(),
                source: e,
            }
        })?;

        let pid = child.id();
        info!(pid = ?pid, "Factorio process spawned");

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout, "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr, "stderr"));
        }

        let handle = tokio::spawn(supervise(child, cancel));
        Ok(FactorioProcess { pid, handle })
    }
}

/// A running Factorio process.
///
/// Await it to get the exit outcome. Polling through `&mut` is cancel-safe,
/// so it can sit in a `select!` loop and be awaited afterwards, as long as
/// it has not already resolved.
#[derive(Debug)]
pub struct FactorioProcess {
    pid: Option<u32>,
    handle: JoinHandle<Result<ExitOutcome, FactorioError>>,
}

impl FactorioProcess {
    /// OS process id, if the process was still running when spawned.
    pub fn id(&self) -> Option<u32> {
        self.pid
    }
}

impl Future for FactorioProcess {
    type Output = Result<ExitOutcome, FactorioError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let joined = ready!(Pin::new(&mut self.handle).poll(cx));
        Poll::Ready(match joined {
            Ok(result) => result,
            Err(e) => Err(FactorioError::Supervisor(e.to_string())),
        })
    }
}

/// Wait for the child to exit, killing it first if cancellation is requested.
async fn supervise(
    mut child: Child,
    cancel: CancellationToken,
) -> Result<ExitOutcome, FactorioError> {
    tokio::select! {
        // Prefer a natural exit when both are ready.
        biased;

        status = child.wait() => {
            let status = status.map_err(FactorioError::Wait)?;
            let outcome = outcome_from_status(status);
            info!(outcome = %outcome, "Factorio process exited");
            Ok(outcome)
        }
        _ = cancel.cancelled() => {
            info!(pid = ?child.id(), "Cancellation requested, terminating Factorio");
            if let Err(e) = child.start_kill() {
                // Exited between the two branches.
                if let Some(status) = child.try_wait().map_err(FactorioError::Wait)? {
                    return Ok(outcome_from_status(status));
                }
                return Err(FactorioError::Kill(e));
            }
            child.wait().await.map_err(FactorioError::Wait)?;
            info!("Factorio process terminated");
            Ok(ExitOutcome::Cancelled)
        }
    }
}

fn outcome_from_status(status: ExitStatus) -> ExitOutcome {
    if status.success() {
        return ExitOutcome::Success;
    }
    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    };
    #[cfg(not(unix))]
    let signal = None;

    ExitOutcome::Failed {
        code: status.code(),
        signal,
    }
}

/// Forward a child stream to the log, one line at a time.
async fn forward_output<R>(stream: R, name: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break, // EOF
            Ok(_) => {
                let trimmed = line.trim_end();
                if trimmed.is_empty() {
                    continue;
                }
                if name == "stderr" {
                    warn!(stream = name, "{}", trimmed);
                } else {
                    debug!(stream = name, "{}", trimmed);
                }
            }
            Err(e) => {
                error!(error = %e, stream = name, "Error reading Factorio output");
                break;
            }
        }
    }
}
