//! Built-in Tools
//!
//! Diagnostic tools served by `adscope serve`.

pub mod shell;

pub use shell::ShellTool;

use super::{Tool, ToolOutput};
use crate::tools::ToolError;
use serde_json::json;

/// Substrings that mark an environment variable as sensitive
const SENSITIVE_KEYS: &[&str] = &["TOKEN", "SECRET", "KEY", "PASSWORD"];

const REDACTED: &str = "[REDACTED]";

/// Echo tool - repeats back the input
pub struct EchoTool;

impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo back the input message. Useful for checking the tool server is reachable."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The message to echo back"
                }
            },
            "required": ["message"]
        })
    }

    fn execute(
        &self,
        params: serde_json::Value,
    ) -> super::BoxFuture<'_, crate::tools::Result<ToolOutput>> {
        Box::pin(async move {
            let message = params
                .get("message")
                .and_then(|v| v.as_str())
                .ok_or_else(|| ToolError::InvalidParameters("message required".to_string()))?;

            Ok(ToolOutput::success(message))
        })
    }
}

/// System info tool - returns host and process information
pub struct SystemInfoTool;

impl Tool for SystemInfoTool {
    fn name(&self) -> &str {
        "system_info"
    }

    fn description(&self) -> &str {
        "Get system information including OS, architecture, hostname and working directory"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    fn execute(
        &self,
        _params: serde_json::Value,
    ) -> super::BoxFuture<'_, crate::tools::Result<ToolOutput>> {
        Box::pin(async move {
            let cwd = std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_default();

            let info = json!({
                "os": std::env::consts::OS,
                "family": std::env::consts::FAMILY,
                "arch": std::env::consts::ARCH,
                "hostname": hostname(),
                "pid": std::process::id(),
                "cwd": cwd,
                "version": env!("CARGO_PKG_VERSION"),
            });

            Ok(ToolOutput::success(serde_json::to_string_pretty(&info)?))
        })
    }
}

/// Environment tool - lists variables with secrets redacted
pub struct EnvTool;

impl Tool for EnvTool {
    fn name(&self) -> &str {
        "env"
    }

    fn description(&self) -> &str {
        "List environment variables, optionally filtered by prefix. Sensitive values are redacted."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "prefix": {
                    "type": "string",
                    "description": "Only include variables whose name starts with this prefix"
                }
            }
        })
    }

    fn execute(
        &self,
        params: serde_json::Value,
    ) -> super::BoxFuture<'_, crate::tools::Result<ToolOutput>> {
        Box::pin(async move {
            let prefix = match params.get("prefix") {
                None | Some(serde_json::Value::Null) => "",
                Some(v) => v.as_str().ok_or_else(|| {
                    ToolError::InvalidParameters("prefix must be a string".to_string())
                })?,
            };

            let vars: std::collections::BTreeMap<String, String> = std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.to_string_lossy().into_owned())))
                .filter(|(k, _)| k.starts_with(prefix))
                .map(|(k, v)| {
                    let v = redact_value(&k, v);
                    (k, v)
                })
                .collect();

            Ok(ToolOutput::success(serde_json::to_string_pretty(&vars)?))
        })
    }
}

fn redact_value(key: &str, value: String) -> String {
    let upper = key.to_ascii_uppercase();
    if SENSITIVE_KEYS.iter().any(|s| upper.contains(s)) {
        REDACTED.to_string()
    } else {
        value
    }
}

#[cfg(unix)]
fn hostname() -> String {
    let mut buf = [0u8; 256];
    // SAFETY: buf is valid for writes of buf.len() bytes.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return String::new();
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

#[cfg(not(unix))]
fn hostname() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_tool() {
        let tool = EchoTool;
        let params = json!({"message": "hello world"});

        let result = tool.execute(params).await.unwrap();
        assert!(result.success);
        assert_eq!(result.content, "hello world");
    }

    #[tokio::test]
    async fn test_echo_requires_message() {
        let err = EchoTool.execute(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn test_system_info_tool() {
        let result = SystemInfoTool.execute(json!({})).await.unwrap();
        assert!(result.success);

        let info: serde_json::Value = serde_json::from_str(&result.content).unwrap();
        assert_eq!(info["os"], std::env::consts::OS);
        assert_eq!(info["arch"], std::env::consts::ARCH);
        assert_eq!(info["pid"], std::process::id());
        assert!(info["cwd"].is_string());
    }

    #[tokio::test]
    async fn test_env_tool_prefix_filter() {
        let result = EnvTool.execute(json!({"prefix": "PATH"})).await.unwrap();
        let vars: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&result.content).unwrap();
        assert!(vars.keys().all(|k| k.starts_with("PATH")));
    }

    #[tokio::test]
    async fn test_env_tool_rejects_non_string_prefix() {
        let err = EnvTool.execute(json!({"prefix": 7})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }

    #[test]
    fn test_redact_value() {
        assert_eq!(redact_value("AIRTABLE_TOKEN", "pat123".into()), REDACTED);
        assert_eq!(redact_value("aws_secret_access_key", "x".into()), REDACTED);
        assert_eq!(redact_value("HOME", "/root".into()), "/root");
    }
}
