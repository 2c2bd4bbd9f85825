//! Terminal states of the Factorio child process.

use std::fmt;

/// How the Factorio process ended.
///
/// `Cancelled` is only ever produced by the supervisor itself after it
/// killed the child on request, never inferred from an exit code or a
/// signal number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitOutcome {
    /// Process exited on its own with status 0.
    Success,
    /// Process exited on its own with any other status.
    Failed {
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// Terminating signal, if the process was killed by a signal we did not send.
        signal: Option<i32>,
    },
    /// Process was terminated by the supervisor following a cancellation request.
    Cancelled,
}

impl ExitOutcome {
    /// Returns true if this outcome ends a render successfully.
    ///
    /// A cancellation is the normal way a render finishes: the marker was
    /// seen and Factorio was stopped.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::Cancelled)
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "exited successfully"),
            Self::Cancelled => write!(f, "terminated after cancellation"),
            Self::Failed {
                code: Some(code), ..
            } => write!(f, "exited with code {}", code),
            Self::Failed {
                signal: Some(signal),
                ..
            } => write!(f, "killed by signal {}", signal),
            Self::Failed { .. } => write!(f, "exited abnormally"),
        }
    }
}
