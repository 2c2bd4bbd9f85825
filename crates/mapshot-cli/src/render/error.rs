//! Errors of the render pipeline.

use std::io;
use std::path::PathBuf;

use mapshot_core::ExitOutcome;
use mapshot_factorio::FactorioError;
use thiserror::Error;

/// Errors while assembling the workspace.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("unable to copy save {} to {}: {source}", .src.display(), .dst.display())]
    CopySave {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to create dir {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to read directory {}: {source}", .path.display())]
    ReadModsDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to read mod list {}: {source}", .path.display())]
    ReadModList {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to parse mod list {}: {source}", .path.display())]
    ParseModList {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to serialize mod list: {0}")]
    SerializeModList(#[source] serde_json::Error),

    /// Without a mod list Factorio would pick its own set of active mods.
    #[error("unable to find `mod-list.json` in {}", .path.display())]
    ModListNotFound { path: PathBuf },

    #[error("unable to copy {} to {}: {source}", .src.display(), .dst.display())]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to write file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors while waiting for the completion marker.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("unable to stat file {}: {source}", .path.display())]
    MarkerCheck {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to read file {}: {source}", .path.display())]
    MarkerRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Factorio stopped before the mod wrote the marker.
    #[error("factorio exited early: {0}")]
    ExitedEarly(ExitOutcome),

    /// Supervision of the process failed before the marker appeared.
    #[error("factorio exited early: {0}")]
    Supervision(#[source] FactorioError),

    #[error("interrupted before completion")]
    Interrupted,
}

impl DetectError {
    /// Returns true if the process exit was already consumed.
    pub fn process_exited(&self) -> bool {
        matches!(self, Self::ExitedEarly(_) | Self::Supervision(_))
    }
}

/// Fatal errors of a render run.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unable to create temp dir: {0}")]
    Workspace(#[source] io::Error),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("staging task failed: {0}")]
    StageTask(String),

    #[error("unable to remove stale marker {}: {source}", .path.display())]
    StaleMarker {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to start Factorio: {0}")]
    Launch(#[source] FactorioError),

    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error("error while waiting for Factorio: {0}")]
    Wait(#[source] FactorioError),

    #[error("error while running Factorio: {0}")]
    FactorioFailed(ExitOutcome),
}

/// The workspace could not be removed.
///
/// Reported next to the run's outcome rather than replacing it.
#[derive(Debug, Error)]
#[error("unable to remove temp dir {}: {source}", .path.display())]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}
