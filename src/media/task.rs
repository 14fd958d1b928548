//! Download tasks and task-list loading.

use super::{MediaError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Placeholder the downloader replaces with the chosen container extension.
pub const EXT_PLACEHOLDER: &str = "%(ext)s";

/// A named source URL as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,
    pub url: String,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Parse a `NAME=URL` command-line argument. Only the first `=` splits,
    /// so query strings survive.
    pub fn parse_arg(arg: &str) -> std::result::Result<Self, String> {
        let (name, url) = arg
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=URL, got '{}'", arg))?;
        let (name, url) = (name.trim(), url.trim());
        if name.is_empty() {
            return Err("task name is empty".to_string());
        }
        if url.is_empty() {
            return Err(format!("task '{}' has an empty URL", name));
        }
        Ok(Self::new(name, url))
    }
}

/// Load a JSON5 array of `{ name, url }` objects.
pub fn load_task_file(path: &Path) -> Result<Vec<TaskSpec>> {
    let raw = std::fs::read_to_string(path).map_err(|source| MediaError::TaskFile {
        path: path.to_path_buf(),
        message: source.to_string(),
    })?;
    json5::from_str(&raw).map_err(|e| MediaError::TaskFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Keep alphanumerics, space, `-` and `_`; trim trailing whitespace.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// One unit of work for the fetcher: logical name, URL and output template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadTask {
    pub name: String,
    pub url: String,
    pub output_template: PathBuf,
}

impl DownloadTask {
    /// Build a task writing to `{dir}/{sanitised name}.%(ext)s`.
    pub fn new(spec: &TaskSpec, dir: &Path) -> Self {
        let name = sanitize_name(&spec.name);
        let output_template = dir.join(format!("{}.{}", name, EXT_PLACEHOLDER));
        Self {
            name,
            url: spec.url.clone(),
            output_template,
        }
    }

    /// Prefix shared by every file the downloader may write for this task.
    pub(crate) fn file_prefix(&self) -> String {
        format!("{}.", self.name)
    }

    pub(crate) fn owns_file(&self, file_name: &str) -> bool {
        !self.name.is_empty() && file_name.starts_with(&self.file_prefix())
    }
}
