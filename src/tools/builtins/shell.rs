//! Shell Tool
//!
//! Runs a command through `sh -c`. Only registered when the server is
//! started with `--allow-shell`.

use crate::tools::{Tool, ToolError, ToolOutput};
use serde_json::json;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

/// Shell passthrough tool
pub struct ShellTool {
    /// Command timeout in seconds
    timeout_secs: u64,
}

impl ShellTool {
    pub fn new() -> Self {
        Self { timeout_secs: 30 }
    }

    /// Set timeout
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for ShellTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Execute a shell command on the host and return its output."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "working_dir": {
                    "type": "string",
                    "description": "Optional working directory for the command"
                }
            },
            "required": ["command"]
        })
    }

    fn execute(
        &self,
        params: serde_json::Value,
    ) -> crate::tools::BoxFuture<'_, crate::tools::Result<ToolOutput>> {
        Box::pin(async move {
            let command_str = params
                .get("command")
                .and_then(|v| v.as_str())
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| ToolError::InvalidParameters("command required".to_string()))?;

            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command_str);

            if let Some(dir) = params.get("working_dir").and_then(|v| v.as_str()) {
                cmd.current_dir(dir);
            }

            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let output = match timeout(Duration::from_secs(self.timeout_secs), cmd.output()).await {
                Ok(result) => result?,
                Err(_) => return Err(ToolError::Timeout(self.timeout_secs)),
            };

            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let content = if stdout.is_empty() {
                stderr.to_string()
            } else {
                stdout.to_string()
            };
            let code = output.status.code().unwrap_or(-1);

            if output.status.success() {
                Ok(ToolOutput::success(content))
            } else {
                Ok(ToolOutput::error(format!("Exit code {code}: {content}")))
            }
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shell_execution() {
        let output = ShellTool::new()
            .execute(json!({"command": "echo hello"}))
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(output.content.trim(), "hello");
    }

    #[tokio::test]
    async fn test_shell_failure_reports_stderr() {
        let output = ShellTool::new()
            .execute(json!({"command": "echo broken >&2; exit 3"}))
            .await
            .unwrap();
        assert!(!output.success);
        assert!(output.content.starts_with("Exit code 3"));
        assert!(output.content.contains("broken"));
    }

    #[tokio::test]
    async fn test_shell_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let output = ShellTool::new()
            .execute(json!({"command": "pwd", "working_dir": dir.path()}))
            .await
            .unwrap();
        let reported = std::fs::canonicalize(output.content.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[tokio::test]
    async fn test_shell_timeout() {
        let err = ShellTool::new()
            .with_timeout(1)
            .execute(json!({"command": "sleep 30"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout(1)));
    }

    #[tokio::test]
    async fn test_shell_requires_command() {
        let err = ShellTool::new().execute(json!({"command": " "})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }
}
