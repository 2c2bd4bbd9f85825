//! Error types for the Factorio integration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while locating or running Factorio.
#[derive(Debug, Error)]
pub enum FactorioError {
    /// No usable Factorio data directory.
    #[error("unable to find Factorio data directory; tried: {}", display_paths(.0))]
    DataDirNotFound(Vec<PathBuf>),

    /// No usable Factorio binary.
    #[error("unable to find Factorio binary; tried: {}", display_paths(.0))]
    BinaryNotFound(Vec<PathBuf>),

    /// Failed to spawn the Factorio process.
    #[error("failed to spawn Factorio binary {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to collect the exit status of the Factorio process.
    #[error("failed waiting for Factorio to exit: {0}")]
    Wait(#[source] std::io::Error),

    /// Failed to terminate the Factorio process after cancellation.
    #[error("failed to terminate Factorio: {0}")]
    Kill(#[source] std::io::Error),

    /// The task supervising the process died.
    #[error("Factorio supervisor task failed: {0}")]
    Supervisor(String),
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "(no candidates)".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_lists_candidates() {
        let err = FactorioError::DataDirNotFound(vec![
            PathBuf::from("/a/factorio"),
            PathBuf::from("/b/factorio"),
        ]);
        assert_eq!(
            err.to_string(),
            "unable to find Factorio data directory; tried: /a/factorio, /b/factorio"
        );
        let err = FactorioError::BinaryNotFound(Vec::new());
        assert!(err.to_string().ends_with("(no candidates)"));
    }
}
