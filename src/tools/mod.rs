//! Diagnostic tools
//!
//! A small registry of callable tools exposed by the local tool server.
//! Tools take JSON parameters and return text.

pub mod builtins;
pub mod registry;
pub mod types;

pub use registry::*;
pub use types::*;

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when working with tools
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool timed out after {0}s")]
    Timeout(u64),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for tool operations
pub type Result<T> = std::result::Result<T, ToolError>;

/// A callable tool
pub trait Tool: Send + Sync {
    /// Get the tool name
    fn name(&self) -> &str;

    /// Get the tool description
    fn description(&self) -> &str;

    /// Get the JSON schema for parameters
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given parameters
    fn execute(&self, params: serde_json::Value) -> BoxFuture<'_, Result<ToolOutput>>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(self.parameters_schema())
    }
}

/// Boxed future for tool execution
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Output from a tool execution
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// The result content
    pub content: String,
    /// Whether the execution was successful
    pub success: bool,
}

impl ToolOutput {
    /// Create a successful output
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            success: true,
        }
    }

    /// Create an error output
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            success: false,
        }
    }
}

/// Registry with the diagnostic built-ins. The shell passthrough is only
/// registered when `allow_shell` is set.
pub fn create_registry(allow_shell: bool, shell_timeout: Duration) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(builtins::EchoTool));
    registry.register(Arc::new(builtins::SystemInfoTool));
    registry.register(Arc::new(builtins::EnvTool));
    if allow_shell {
        registry.register(Arc::new(
            builtins::ShellTool::new().with_timeout(shell_timeout.as_secs()),
        ));
    }

    registry
}
