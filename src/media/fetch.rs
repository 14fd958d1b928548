//! Sequential media fetching
//!
//! Runs the downloader once per task, in input order, and never lets a
//! single task's failure stop the run. Only failing to create the output
//! directory is fatal.

use super::downloader::{DownloaderConfig, ProcessExit};
use super::manifest::{build_manifest, snapshot, ManifestEntry};
use super::task::{DownloadTask, TaskSpec};
use super::{MediaError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

/// Files the downloader leaves behind mid-transfer.
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".temp"];

/// Result of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum DownloadOutcome {
    Success { path: PathBuf, size: u64 },
    Failed { reason: String },
    TimedOut { after_secs: u64 },
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Success { .. })
    }
}

/// Outcome paired with the task it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReport {
    pub name: String,
    pub url: String,
    #[serde(flatten)]
    pub outcome: DownloadOutcome,
}

/// Everything a fetch run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchReport {
    pub dir: PathBuf,
    pub outcomes: Vec<TaskReport>,
    pub manifest: Vec<ManifestEntry>,
}

impl FetchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_success()).count()
    }
}

/// Media fetcher around an external downloader.
#[derive(Debug, Clone, Default)]
pub struct MediaFetcher {
    downloader: DownloaderConfig,
}

impl MediaFetcher {
    pub fn new(downloader: DownloaderConfig) -> Self {
        Self { downloader }
    }

    /// Download every task into `dir`, then list the directory.
    pub async fn run(&self, specs: &[TaskSpec], dir: &Path) -> Result<FetchReport> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| MediaError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        let preexisting = snapshot(dir).await.map_err(|source| MediaError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;

        info!(dir = %dir.display(), tasks = specs.len(), "starting fetch run");

        let mut outcomes = Vec::with_capacity(specs.len());
        for spec in specs {
            let task = DownloadTask::new(spec, dir);
            let outcome = self.run_task(&task, dir, &preexisting).await;
            match &outcome {
                DownloadOutcome::Success { path, size } => {
                    info!(task = %task.name, path = %path.display(), size, "download complete")
                }
                DownloadOutcome::Failed { reason } => {
                    warn!(task = %task.name, reason = %reason, "download failed")
                }
                DownloadOutcome::TimedOut { after_secs } => {
                    warn!(task = %task.name, after_secs, "download timed out")
                }
            }
            outcomes.push(TaskReport {
                name: spec.name.clone(),
                url: spec.url.clone(),
                outcome,
            });
        }

        let manifest = build_manifest(dir)
            .await
            .map_err(|source| MediaError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })?;

        Ok(FetchReport {
            dir: dir.to_path_buf(),
            outcomes,
            manifest,
        })
    }

    async fn run_task(
        &self,
        task: &DownloadTask,
        dir: &Path,
        preexisting: &HashSet<OsString>,
    ) -> DownloadOutcome {
        if task.name.is_empty() {
            return DownloadOutcome::Failed {
                reason: "logical name is empty after sanitising".to_string(),
            };
        }
        if let Some(existing) = preexisting
            .iter()
            .map(|n| n.to_string_lossy())
            .find(|n| task.owns_file(n))
        {
            return DownloadOutcome::Failed {
                reason: format!("refusing to overwrite existing file {}", existing),
            };
        }

        let exit = match self.downloader.run(task).await {
            Ok(exit) => exit,
            Err(e) => {
                return DownloadOutcome::Failed {
                    reason: format!("failed to start {}: {}", self.downloader.program, e),
                }
            }
        };

        match exit {
            ProcessExit::TimedOut => {
                remove_task_files(task, dir, preexisting).await;
                DownloadOutcome::TimedOut {
                    after_secs: self.downloader.timeout.as_secs(),
                }
            }
            ProcessExit::Exited { status, stderr } if status.success() => {
                let outcome = match produced_file(task, dir, preexisting).await {
                    Some((path, size)) => DownloadOutcome::Success { path, size },
                    None => DownloadOutcome::Failed {
                        reason: "downloader exited successfully but produced no file".to_string(),
                    },
                };
                outcome.with_stderr_hint(&stderr)
            }
            ProcessExit::Exited { status, stderr } => {
                let stderr = stderr.trim();
                DownloadOutcome::Failed {
                    reason: if stderr.is_empty() {
                        format!("downloader {}", status)
                    } else {
                        stderr.to_string()
                    },
                }
            }
        }
    }
}

impl DownloadOutcome {
    fn with_stderr_hint(self, stderr: &str) -> Self {
        match self {
            DownloadOutcome::Failed { reason } if !stderr.trim().is_empty() => {
                DownloadOutcome::Failed {
                    reason: format!("{}: {}", reason, stderr.trim()),
                }
            }
            other => other,
        }
    }
}

fn is_partial(name: &str) -> bool {
    PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Files under `dir` written for `task` during this run.
async fn task_files(
    task: &DownloadTask,
    dir: &Path,
    preexisting: &HashSet<OsString>,
) -> Vec<(PathBuf, std::fs::Metadata)> {
    let mut found = Vec::new();
    let Ok(mut reader) = tokio::fs::read_dir(dir).await else {
        return found;
    };
    while let Ok(Some(entry)) = reader.next_entry().await {
        let file_name = entry.file_name();
        if preexisting.contains(&file_name) || !task.owns_file(&file_name.to_string_lossy()) {
            continue;
        }
        if let Ok(metadata) = entry.metadata().await {
            if metadata.is_file() {
                found.push((entry.path(), metadata));
            }
        }
    }
    found
}

/// The most recently written complete file for `task`.
async fn produced_file(
    task: &DownloadTask,
    dir: &Path,
    preexisting: &HashSet<OsString>,
) -> Option<(PathBuf, u64)> {
    task_files(task, dir, preexisting)
        .await
        .into_iter()
        .filter(|(path, _)| !is_partial(&path.to_string_lossy()))
        .max_by_key(|(_, m)| m.modified().unwrap_or(SystemTime::UNIX_EPOCH))
        .map(|(path, m)| (path, m.len()))
}

async fn remove_task_files(task: &DownloadTask, dir: &Path, preexisting: &HashSet<OsString>) {
    for (path, _) in task_files(task, dir, preexisting).await {
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "could not remove partial download");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serialization() {
        let outcome = DownloadOutcome::TimedOut { after_secs: 60 };
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({"status": "timed-out", "after_secs": 60})
        );
        let report = TaskReport {
            name: "clip".into(),
            url: "https://example.test/v".into(),
            outcome: DownloadOutcome::Success {
                path: PathBuf::from("out/clip.mp4"),
                size: 42,
            },
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({
                "name": "clip",
                "url": "https://example.test/v",
                "status": "success",
                "path": "out/clip.mp4",
                "size": 42
            })
        );
    }

    #[test]
    fn test_partial_suffixes() {
        assert!(is_partial("clip.mp4.part"));
        assert!(is_partial("clip.mp4.ytdl"));
        assert!(!is_partial("clip.mp4"));
    }

    #[tokio::test]
    async fn test_refuses_to_overwrite_preexisting_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.mp4"), b"keep me").unwrap();

        let fetcher = MediaFetcher::new(DownloaderConfig {
            program: "/nonexistent/downloader".into(),
            ..Default::default()
        });
        let report = fetcher
            .run(&[TaskSpec::new("clip", "https://example.test/v")], dir.path())
            .await
            .unwrap();

        match &report.outcomes[0].outcome {
            DownloadOutcome::Failed { reason } => assert!(reason.contains("refusing to overwrite")),
            other => panic!("expected Failed, got {:?}", other),
        }
        assert_eq!(std::fs::read(dir.path().join("clip.mp4")).unwrap(), b"keep me");
    }

    #[tokio::test]
    async fn test_missing_downloader_is_per_task_failure() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MediaFetcher::new(DownloaderConfig {
            program: "/nonexistent/downloader".into(),
            ..Default::default()
        });
        let specs = vec![
            TaskSpec::new("a", "https://example.test/a"),
            TaskSpec::new("b", "https://example.test/b"),
        ];
        let report = fetcher.run(&specs, dir.path()).await.unwrap();
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].name, "a");
        assert_eq!(report.outcomes[1].name, "b");
        assert!(report
            .outcomes
            .iter()
            .all(|o| matches!(&o.outcome, DownloadOutcome::Failed { reason } if reason.contains("failed to start"))));
        assert_eq!(report.succeeded(), 0);
    }

    #[tokio::test]
    async fn test_empty_name_fails() {
        let dir = tempfile::tempdir().unwrap();
        let report = MediaFetcher::default()
            .run(&[TaskSpec::new("///", "https://example.test/a")], dir.path())
            .await
            .unwrap();
        assert!(matches!(
            &report.outcomes[0].outcome,
            DownloadOutcome::Failed { reason } if reason.contains("empty")
        ));
    }

    #[tokio::test]
    async fn test_creates_nested_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a").join("b");
        let report = MediaFetcher::default().run(&[], &target).await.unwrap();
        assert!(target.is_dir());
        assert!(report.outcomes.is_empty());
        assert!(report.manifest.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unwritable_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();
        let err = MediaFetcher::default()
            .run(&[], &blocker.join("sub"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::CreateDir { .. }));
    }
}
