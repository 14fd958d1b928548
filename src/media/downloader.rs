//! External downloader process control
//!
//! Each invocation runs in its own process group so a timeout can take down
//! the downloader together with anything it forked (ffmpeg merges, helper
//! processes). Stdout is discarded; stderr is captured for diagnostics.

use super::task::DownloadTask;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

pub const DEFAULT_DOWNLOADER: &str = "yt-dlp";

/// Best single-file stream in an MP4 container.
pub const DEFAULT_FORMAT: &str = "best[ext=mp4]";

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// How long to keep reading stderr once the downloader has exited.
const STDERR_GRACE: Duration = Duration::from_secs(2);

/// How to invoke the downloader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloaderConfig {
    pub program: String,
    pub format: String,
    pub timeout: Duration,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_DOWNLOADER.to_string(),
            format: DEFAULT_FORMAT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// How a downloader process ended.
#[derive(Debug)]
pub enum ProcessExit {
    Exited { status: ExitStatus, stderr: String },
    TimedOut,
}

impl DownloaderConfig {
    /// Arguments passed for a task, program excluded.
    pub fn args(&self, task: &DownloadTask) -> Vec<String> {
        vec![
            task.url.clone(),
            "-f".to_string(),
            self.format.clone(),
            "-o".to_string(),
            task.output_template.to_string_lossy().into_owned(),
            "--no-check-certificate".to_string(),
        ]
    }

    /// Run the downloader for one task, enforcing the wall-clock timeout.
    ///
    /// Returns `Err` only when the process could not be started.
    pub async fn run(&self, task: &DownloadTask) -> std::io::Result<ProcessExit> {
        let mut command = std::process::Command::new(&self.program);
        command
            .args(self.args(task))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut command = Command::from(command);
        command.kill_on_drop(true);
        let mut child = command.spawn()?;
        let pid = child.id();
        debug!(pid = ?pid, program = %self.program, url = %task.url, "downloader started");

        let stderr_pipe = child.stderr.take();
        let mut drain = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stderr_pipe {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });

        // Only the downloader itself is timed; helpers it leaves behind are not.
        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                drain.abort();
                return Err(e);
            }
            Err(_) => {
                kill_group(pid);
                if let Err(e) = child.kill().await {
                    debug!(error = %e, "downloader already gone");
                }
                drain.abort();
                return Ok(ProcessExit::TimedOut);
            }
        };

        // Stragglers in the group would otherwise hold stderr open.
        kill_group(pid);
        let stderr = match tokio::time::timeout(STDERR_GRACE, &mut drain).await {
            Ok(Ok(buf)) => buf,
            Ok(Err(e)) => {
                debug!(error = %e, "stderr reader failed");
                Vec::new()
            }
            Err(_) => {
                warn!(pid = ?pid, "stderr still open after downloader exit, discarding");
                drain.abort();
                Vec::new()
            }
        };

        Ok(ProcessExit::Exited {
            status,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}

/// SIGKILL the process group led by `pid`. A group that is already empty
/// is not an error.
fn kill_group(pid: Option<u32>) {
    #[cfg(unix)]
    {
        let Some(pid) = pid else { return };
        // SAFETY: killpg takes no pointers; the child was spawned with
        // process_group(0), so its pid is the pgid of its group.
        let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                warn!(pid, error = %err, "failed to kill downloader process group");
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pid;
}
