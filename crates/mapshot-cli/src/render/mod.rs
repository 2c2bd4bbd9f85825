//! The render pipeline.
//!
//! A render stages a private workspace, starts Factorio against it, waits
//! for the embedded mod to write its marker file, stops Factorio and removes
//! the workspace. The workspace is removed whatever happened before.

mod detect;
mod error;
mod fs;
mod stage;
mod workspace;

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mapshot_core::overrides::DEFAULT_TILE_MIN;
use mapshot_core::{ExitOutcome, RunId};
use mapshot_factorio::{launch_args, Factorio};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

pub use detect::CompletionDetector;
pub use error::{CleanupError, DetectError, RenderError, StageError};
pub use fs::{OsFs, StagingFs};
pub use stage::{classify_entry, stage, EntryAction, StageRequest, StagedWorkspace};
pub use workspace::Workspace;

/// Knobs of a render run.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Leave Factorio running once the marker appears and wait for it to
    /// exit on its own.
    pub keep_running: bool,

    /// How often to check for the marker.
    pub poll_interval: Duration,

    /// Minimum tile size passed to the mod.
    pub tile_min: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            keep_running: false,
            poll_interval: Duration::from_secs(1),
            tile_min: DEFAULT_TILE_MIN,
        }
    }
}

/// A successful render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Location of the output: script-output joined with the marker content.
    pub output: PathBuf,

    /// How Factorio ended.
    pub exit: ExitOutcome,
}

/// Everything a render run produced.
#[derive(Debug)]
pub struct RenderReport {
    pub run_id: RunId,

    /// Workspace used by the run, if one was created.
    pub workspace: Option<PathBuf>,

    pub outcome: Result<Rendered, RenderError>,

    /// Removal of the workspace. Its failure does not change `outcome`.
    pub cleanup: Result<(), CleanupError>,
}

/// Output name for a save: its file name without a trailing `.zip`.
pub fn shot_name(save: &str) -> String {
    let name = Path::new(save)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| save.to_string());
    match name.strip_suffix(".zip") {
        Some(stem) => stem.to_string(),
        None => name,
    }
}

/// Render a save.
///
/// Cancelling `shutdown` stops Factorio, removes the workspace and ends the
/// run with [`DetectError::Interrupted`] if the marker was not seen yet.
pub async fn render(
    factorio: &Factorio,
    save: &str,
    options: &RenderOptions,
    shutdown: CancellationToken,
) -> RenderReport {
    let run_id = RunId::generate();
    let span = info_span!("render", run_id = %run_id, save = %save);
    run(factorio, save, options, shutdown, run_id)
        .instrument(span)
        .await
}

async fn run(
    factorio: &Factorio,
    save: &str,
    options: &RenderOptions,
    shutdown: CancellationToken,
    run_id: RunId,
) -> RenderReport {
    info!("Starting render");

    let workspace = match Workspace::create() {
        Ok(workspace) => workspace,
        Err(e) => {
            return RenderReport {
                run_id,
                workspace: None,
                outcome: Err(RenderError::Workspace(e)),
                cleanup: Ok(()),
            }
        }
    };
    let workspace_path = workspace.path().to_path_buf();
    info!(path = %workspace_path.display(), "Temp dir created");

    let outcome = run_in_workspace(factorio, save, options, &shutdown, &run_id, &workspace_path).await;

    let cleanup = workspace.remove();
    match &cleanup {
        Ok(()) => info!(path = %workspace_path.display(), "Temp dir removed"),
        Err(e) => warn!(error = %e, "Failed to remove temp dir"),
    }

    RenderReport {
        run_id,
        workspace: Some(workspace_path),
        outcome,
        cleanup,
    }
}

async fn run_in_workspace(
    factorio: &Factorio,
    save: &str,
    options: &RenderOptions,
    shutdown: &CancellationToken,
    run_id: &RunId,
    root: &Path,
) -> Result<Rendered, RenderError> {
    let request = StageRequest {
        save: factorio.save_file(save),
        shot_name: shot_name(save),
        mods: factorio.mods_dir(),
        run_id: run_id.clone(),
        tile_min: options.tile_min,
    };
    let staged = {
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || stage(&OsFs, &root, &request))
            .await
            .map_err(|e| RenderError::StageTask(e.to_string()))??
    };

    let script_output = factorio.script_output();
    let marker = script_output.join(run_id.marker_file_name());
    remove_stale_marker(&marker).await?;

    // A child of the shutdown token, so an interrupt also stops Factorio.
    let stop = shutdown.child_token();
    let args = launch_args(&staged.save, &staged.mods);
    info!(args = ?args, "Factorio args");
    let mut process = factorio
        .executor()
        .launch(args, stop.clone())
        .map_err(RenderError::Launch)?;

    let detector = CompletionDetector::new(marker, options.poll_interval);
    info!(path = %detector.marker().display(), "Waiting for done file");
    let on_complete = (!options.keep_running).then_some(&stop);
    let prefix = match detector.wait(&mut process, on_complete, shutdown).await {
        Ok(prefix) => prefix,
        Err(e) => {
            if !e.process_exited() {
                stop.cancel();
                match process.await {
                    Ok(outcome) => info!(outcome = %outcome, "Factorio stopped after failure"),
                    Err(err) => warn!(error = %err, "Failed to stop Factorio"),
                }
            }
            return Err(e.into());
        }
    };

    if options.keep_running {
        info!("Waiting for Factorio to exit");
    }
    let exit = process.await.map_err(RenderError::Wait)?;
    if !exit.is_success() {
        return Err(RenderError::FactorioFailed(exit));
    }

    let output = script_output.join(&prefix);
    info!(output = %output.display(), exit = %exit, "Render complete");
    Ok(Rendered { output, exit })
}

/// Remove a marker left over by an earlier run with the same id.
async fn remove_stale_marker(marker: &Path) -> Result<(), RenderError> {
    match tokio::fs::remove_file(marker).await {
        Ok(()) => {
            info!(path = %marker.display(), "Removed stale done file");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(RenderError::StaleMarker {
            path: marker.to_path_buf(),
            source,
        }),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// A Factorio data directory with a fake binary.
    ///
    /// The binary reads the run id from the staged overrides, then runs
    /// `body` with `$MARKER` pointing at the marker file.
    struct FakeFactorio {
        dir: TempDir,
        factorio: Factorio,
    }

    impl FakeFactorio {
        fn new(body: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let data = dir.path().join("data");
            std::fs::create_dir_all(data.join("saves")).unwrap();
            std::fs::create_dir_all(data.join("mods").join("base-extras")).unwrap();
            std::fs::create_dir_all(data.join("script-output")).unwrap();
            std::fs::write(data.join("saves").join("foo.zip"), b"save").unwrap();
            std::fs::write(
                data.join("mods").join("mod-list.json"),
                br#"{"mods": [{"name": "base", "enabled": true}]}"#,
            )
            .unwrap();
            std::fs::write(data.join("mods").join("base-extras").join("info.json"), b"{}").unwrap();

            let binary = dir.path().join("factorio");
            let script = format!(
                r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    --mod-directory) mods="$2"; shift ;;
  esac
  shift
done
id=$(sed -n 's/.*onstartup = "\(.*\)",/\1/p' "$mods/mapshot/overrides.lua")
MARKER="{}/mapshot-done-$id"
echo "launched" > "{}/launched"
{}
"#,
                data.join("script-output").display(),
                dir.path().display(),
                body
            );
            std::fs::write(&binary, script).unwrap();
            std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();

            let factorio = Factorio::from_paths(&data, &binary);
            Self { dir, factorio }
        }

        fn launched(&self) -> bool {
            self.dir.path().join("launched").exists()
        }
    }

    fn options() -> RenderOptions {
        RenderOptions {
            poll_interval: Duration::from_millis(50),
            ..RenderOptions::default()
        }
    }

    #[test]
    fn test_shot_name() {
        assert_eq!(shot_name("foo"), "foo");
        assert_eq!(shot_name("/saves/bar.zip"), "bar");
        assert_eq!(shot_name("baz.zip"), "baz");
        assert_eq!(shot_name("base.v1"), "base.v1");
        assert_eq!(shot_name("/saves/base.v2.zip"), "base.v2");
        assert_ne!(shot_name("base.v1"), shot_name("base.v2"));
    }

    #[tokio::test]
    #[serial]
    async fn test_render_cancels_after_marker() {
        let fake = FakeFactorio::new(
            r#"sleep 0.15
printf 'foo/screenshot' > "$MARKER"
exec sleep 30"#,
        );

        let report = render(&fake.factorio, "foo", &options(), CancellationToken::new()).await;

        let rendered = report.outcome.unwrap();
        assert_eq!(
            rendered.output,
            fake.factorio.script_output().join("foo/screenshot")
        );
        assert_eq!(rendered.exit, ExitOutcome::Cancelled);
        assert!(report.cleanup.is_ok());
        assert!(!report.workspace.unwrap().exists());
    }

    #[tokio::test]
    #[serial]
    async fn test_cleanup_failure_keeps_successful_outcome() {
        // The workspace disappears under the run, so removing it fails.
        let fake = FakeFactorio::new(
            r#"rm -rf "$(dirname "$mods")"
printf 'foo/screenshot' > "$MARKER"
exec sleep 30"#,
        );

        let report = render(&fake.factorio, "foo", &options(), CancellationToken::new()).await;

        let rendered = report.outcome.unwrap();
        assert_eq!(
            rendered.output,
            fake.factorio.script_output().join("foo/screenshot")
        );
        assert_eq!(rendered.exit, ExitOutcome::Cancelled);
        let cleanup = report.cleanup.unwrap_err();
        assert_eq!(Some(cleanup.path), report.workspace);
    }

    #[tokio::test]
    #[serial]
    async fn test_render_stages_workspace_for_factorio() {
        // The fake checks the staged tree before signalling completion.
        let fake = FakeFactorio::new(
            r#"test -f "$mods/mod-list.json" || exit 10
test -f "$mods/mapshot/control.lua" || exit 11
test -f "$mods/base-extras/info.json" || exit 12
grep -q '"mapshot"' "$mods/mod-list.json" || exit 13
printf 'foo' > "$MARKER"
exec sleep 30"#,
        );

        let report = render(&fake.factorio, "foo", &options(), CancellationToken::new()).await;
        assert!(report.outcome.is_ok(), "{:?}", report.outcome);
    }

    #[tokio::test]
    #[serial]
    async fn test_render_fails_when_factorio_exits_early() {
        let fake = FakeFactorio::new("exit 3");

        let report = render(&fake.factorio, "foo", &options(), CancellationToken::new()).await;

        let err = report.outcome.unwrap_err();
        assert!(matches!(
            err,
            RenderError::Detect(DetectError::ExitedEarly(ExitOutcome::Failed { code: Some(3), .. }))
        ));
        assert!(err.to_string().contains("exited early"));
        assert!(!report.workspace.unwrap().exists());
    }

    #[tokio::test]
    #[serial]
    async fn test_keep_running_waits_for_natural_exit() {
        let fake = FakeFactorio::new(
            r#"printf 'foo/screenshot' > "$MARKER"
sleep 0.3
exit 0"#,
        );
        let options = RenderOptions {
            keep_running: true,
            ..options()
        };

        let report = render(&fake.factorio, "foo", &options, CancellationToken::new()).await;

        let rendered = report.outcome.unwrap();
        assert_eq!(rendered.exit, ExitOutcome::Success);
        assert!(!report.workspace.unwrap().exists());
    }

    #[tokio::test]
    #[serial]
    async fn test_failed_exit_after_marker_is_error() {
        let fake = FakeFactorio::new(
            r#"printf 'foo' > "$MARKER"
sleep 0.2
exit 4"#,
        );
        let options = RenderOptions {
            keep_running: true,
            ..options()
        };

        let report = render(&fake.factorio, "foo", &options, CancellationToken::new()).await;

        assert!(matches!(
            report.outcome,
            Err(RenderError::FactorioFailed(ExitOutcome::Failed { code: Some(4), .. }))
        ));
        assert!(!report.workspace.unwrap().exists());
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_mod_list_never_launches() {
        let fake = FakeFactorio::new("exec sleep 30");
        std::fs::remove_file(fake.factorio.mods_dir().join("mod-list.json")).unwrap();

        let report = render(&fake.factorio, "foo", &options(), CancellationToken::new()).await;

        assert!(matches!(
            report.outcome,
            Err(RenderError::Stage(StageError::ModListNotFound { .. }))
        ));
        assert!(!fake.launched());
        assert!(!report.workspace.unwrap().exists());
    }

    #[tokio::test]
    #[serial]
    async fn test_interrupt_stops_factorio() {
        let fake = FakeFactorio::new("exec sleep 30");
        let shutdown = CancellationToken::new();
        let trigger = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                shutdown.cancel();
            })
        };

        let report = tokio::time::timeout(
            Duration::from_secs(10),
            render(&fake.factorio, "foo", &options(), shutdown),
        )
        .await
        .expect("interrupt should end the run");
        trigger.await.unwrap();

        assert!(matches!(
            report.outcome,
            Err(RenderError::Detect(DetectError::Interrupted))
        ));
        assert!(fake.launched());
        assert!(!report.workspace.unwrap().exists());
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_binary() {
        let fake = FakeFactorio::new("exit 0");
        let factorio = Factorio::from_paths(
            fake.factorio.data_dir(),
            fake.dir.path().join("missing-factorio"),
        );

        let report = render(&factorio, "foo", &options(), CancellationToken::new()).await;

        assert!(matches!(report.outcome, Err(RenderError::Launch(_))));
        assert!(!report.workspace.unwrap().exists());
    }

    #[tokio::test]
    async fn test_remove_stale_marker() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("mapshot-done-x");

        remove_stale_marker(&marker).await.unwrap();

        std::fs::write(&marker, "old").unwrap();
        remove_stale_marker(&marker).await.unwrap();
        assert!(!marker.exists());
    }
}
