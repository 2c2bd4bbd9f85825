//! Completion detection through the marker file.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mapshot_core::ExitOutcome;
use mapshot_factorio::FactorioError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::error::DetectError;

/// Polls for the marker file the mod writes when it is done.
///
/// Only a direct filesystem check counts; nothing the process prints or
/// returns is taken as completion.
#[derive(Debug, Clone)]
pub struct CompletionDetector {
    marker: PathBuf,
    interval: Duration,
}

impl CompletionDetector {
    pub fn new(marker: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            marker: marker.into(),
            interval,
        }
    }

    pub fn marker(&self) -> &Path {
        &self.marker
    }

    /// Wait for the marker and return its content, the output prefix.
    ///
    /// Once the marker is seen, `on_complete` is cancelled to stop the
    /// process; pass `None` to leave it running. If `exit` resolves first,
    /// the process ended before completing and that is an error. `exit` is
    /// only polled while the marker is missing, so when this returns `Ok` it
    /// is still pending and can be awaited by the caller.
    pub async fn wait<F>(
        &self,
        exit: &mut F,
        on_complete: Option<&CancellationToken>,
        shutdown: &CancellationToken,
    ) -> Result<String, DetectError>
    where
        F: Future<Output = Result<ExitOutcome, FactorioError>> + Unpin,
    {
        let mut polls: u64 = 0;
        loop {
            if self.marker_exists().await? {
                info!(path = %self.marker.display(), polls, "Done file now exists");
                if let Some(token) = on_complete {
                    token.cancel();
                }
                break;
            }
            polls += 1;

            tokio::select! {
                // An interrupt wins over the exit it causes.
                biased;

                _ = shutdown.cancelled() => {
                    return Err(DetectError::Interrupted);
                }
                result = &mut *exit => {
                    return Err(match result {
                        Ok(outcome) => DetectError::ExitedEarly(outcome),
                        Err(e) => DetectError::Supervision(e),
                    });
                }
                _ = tokio::time::sleep(self.interval) => {
                    debug!(polls, "Done file not there yet");
                }
            }
        }

        let raw = tokio::fs::read_to_string(&self.marker)
            .await
            .map_err(|source| DetectError::MarkerRead {
                path: self.marker.clone(),
                source,
            })?;
        let prefix = raw.trim_end_matches(|c| c == '\n' || c == '\r').to_string();
        info!(prefix = %prefix, "Output prefix read");
        Ok(prefix)
    }

    async fn marker_exists(&self) -> Result<bool, DetectError> {
        match tokio::fs::metadata(&self.marker).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(DetectError::MarkerCheck {
                path: self.marker.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::{pending, ready, Pending};
    use tempfile::TempDir;

    const INTERVAL: Duration = Duration::from_millis(20);

    fn never_exits() -> Pending<Result<ExitOutcome, FactorioError>> {
        pending()
    }

    #[tokio::test]
    async fn test_marker_already_present() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("mapshot-done-a");
        std::fs::write(&marker, "foo/screenshot\n").unwrap();

        let detector = CompletionDetector::new(&marker, INTERVAL);
        let stop = CancellationToken::new();
        let prefix = detector
            .wait(&mut never_exits(), Some(&stop), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(prefix, "foo/screenshot");
        assert!(stop.is_cancelled());
    }

    #[tokio::test]
    async fn test_marker_appears_later() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("mapshot-done-b");
        let writer = {
            let marker = marker.clone();
            tokio::spawn(async move {
                tokio::time::sleep(INTERVAL * 3).await;
                tokio::fs::write(&marker, "foo/screenshot").await.unwrap();
            })
        };

        let detector = CompletionDetector::new(&marker, INTERVAL);
        let stop = CancellationToken::new();
        let prefix = detector
            .wait(&mut never_exits(), Some(&stop), &CancellationToken::new())
            .await
            .unwrap();

        writer.await.unwrap();
        assert_eq!(prefix, "foo/screenshot");
        assert!(stop.is_cancelled());
    }

    #[tokio::test]
    async fn test_keep_running_does_not_cancel() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("mapshot-done-c");
        std::fs::write(&marker, "foo").unwrap();

        let detector = CompletionDetector::new(&marker, INTERVAL);
        let prefix = detector
            .wait(&mut never_exits(), None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(prefix, "foo");
    }

    #[tokio::test]
    async fn test_exit_before_marker() {
        let dir = TempDir::new().unwrap();
        let detector = CompletionDetector::new(dir.path().join("mapshot-done-d"), INTERVAL);
        let stop = CancellationToken::new();
        let mut exit = ready(Ok(ExitOutcome::Failed {
            code: Some(1),
            signal: None,
        }));

        let err = detector
            .wait(&mut exit, Some(&stop), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DetectError::ExitedEarly(ExitOutcome::Failed { code: Some(1), .. })));
        assert!(err.process_exited());
        assert!(!stop.is_cancelled());
    }

    #[tokio::test]
    async fn test_clean_exit_before_marker_is_still_early() {
        let dir = TempDir::new().unwrap();
        let detector = CompletionDetector::new(dir.path().join("mapshot-done-e"), INTERVAL);
        let mut exit = ready(Ok(ExitOutcome::Success));

        let err = detector
            .wait(&mut exit, None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DetectError::ExitedEarly(ExitOutcome::Success)));
    }

    #[tokio::test]
    async fn test_shutdown_interrupts() {
        let dir = TempDir::new().unwrap();
        let detector = CompletionDetector::new(dir.path().join("mapshot-done-f"), INTERVAL);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let err = detector
            .wait(&mut never_exits(), None, &shutdown)
            .await
            .unwrap_err();
        assert!(matches!(err, DetectError::Interrupted));
        assert!(!err.process_exited());
    }

    #[tokio::test]
    async fn test_check_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let not_a_dir = dir.path().join("file");
        std::fs::write(&not_a_dir, "x").unwrap();

        let detector = CompletionDetector::new(not_a_dir.join("mapshot-done-g"), INTERVAL);
        let err = detector
            .wait(&mut never_exits(), None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DetectError::MarkerCheck { .. }));
    }

    #[tokio::test]
    async fn test_unreadable_marker_is_fatal() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("mapshot-done-h");
        std::fs::create_dir(&marker).unwrap();

        let detector = CompletionDetector::new(&marker, INTERVAL);
        let err = detector
            .wait(&mut never_exits(), None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DetectError::MarkerRead { .. }));
    }
}
