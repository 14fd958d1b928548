//! Media acquisition
//!
//! Downloads public preview URLs through an external downloader (`yt-dlp`
//! by default):
//!
//! - **MediaFetcher**: runs tasks sequentially into one output directory
//!   - MP4-preferring format selector
//!   - per-task wall-clock timeout with process-group termination
//!   - never overwrites files that existed before the run
//!   - manifest of the directory afterwards
//!
//! - **TaskSpec / DownloadTask**: `NAME=URL` pairs, task files (JSON5), and
//!   the output template derived from them
//!
//! # Example
//!
//! ```ignore
//! use adscope::media::{MediaFetcher, TaskSpec};
//!
//! let specs = vec![TaskSpec::new("01_David", "https://fb.me/27UD3eHw89SZ4w1")];
//! let report = MediaFetcher::default().run(&specs, "creatives".as_ref()).await?;
//! for entry in &report.manifest {
//!     println!("{} {}", entry.name, entry.size);
//! }
//! ```

pub mod downloader;
pub mod fetch;
pub mod manifest;
pub mod task;

pub use downloader::{
    DownloaderConfig, ProcessExit, DEFAULT_DOWNLOADER, DEFAULT_FORMAT, DEFAULT_TIMEOUT_SECS,
};
pub use fetch::{DownloadOutcome, FetchReport, MediaFetcher, TaskReport};
pub use manifest::{build_manifest, ManifestEntry};
pub use task::{load_task_file, sanitize_name, DownloadTask, TaskSpec, EXT_PLACEHOLDER};

use std::path::PathBuf;
use thiserror::Error;

/// Fatal media errors. Per-task problems are reported as
/// [`DownloadOutcome`]s instead.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("cannot create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot read output directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid task file {}: {message}", path.display())]
    TaskFile { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, MediaError>;
